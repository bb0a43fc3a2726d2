use std::ops::Range;

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha384;
use subtle::ConstantTimeEq;

use crate::error::TlsError;
use crate::key_schedule::{derive_traffic_iv, derive_traffic_key};
use crate::msgs::codec::{put_u64, Codec, Reader};
use crate::msgs::deframer::{HEADER_SIZE, MAX_FRAGMENT_LEN};
use crate::msgs::enums::ContentType;
use crate::rand::RandomSource;
use crate::suites::{BulkAlgorithm, MacAlgorithm, SupportedCipherSuite};

const TAG_LEN: usize = 16;
const GCM_EXPLICIT_NONCE_LEN: usize = 8;
const CBC_BLOCK_LEN: usize = 16;

// accum[i] ^= offset[i] for all i in 0..len(accum)
fn xor(accum: &mut [u8], offset: &[u8]) {
    for i in 0..accum.len() {
        accum[i] ^= offset[i];
    }
}

const TLS12_AAD_SIZE: usize = 8 + 1 + 2 + 2;
fn make_tls12_aad(seq: u64, typ: ContentType, len: usize, out: &mut [u8]) {
    put_u64(seq, &mut out[0..]);
    out[8] = typ.get_u8();
    out[9] = 0x03;
    out[10] = 0x03;
    out[11] = (len >> 8) as u8;
    out[12] = len as u8;
}

const TLS13_AAD_SIZE: usize = 1 + 2 + 2;
fn make_tls13_aad(len: usize, out: &mut [u8]) {
    out[0] = ContentType::ApplicationData.get_u8();
    out[1] = 0x03;
    out[2] = 0x03;
    out[3] = (len >> 8) as u8;
    out[4] = len as u8;
}

/// One AEAD instance; the variant fixes both algorithm and key size.
enum Aead {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
    ChaCha20(ChaCha20Poly1305),
}

impl Aead {
    fn new(bulk: BulkAlgorithm, key: &[u8]) -> Aead {
        match bulk {
            BulkAlgorithm::AES_128_GCM => Aead::Aes128(Aes128Gcm::new_from_slice(key).unwrap()),
            BulkAlgorithm::AES_256_GCM => Aead::Aes256(Aes256Gcm::new_from_slice(key).unwrap()),
            BulkAlgorithm::CHACHA20_POLY1305 => {
                Aead::ChaCha20(ChaCha20Poly1305::new_from_slice(key).unwrap())
            }
            _ => unreachable!(),
        }
    }

    fn seal(&self, nonce: &[u8; 12], aad: &[u8], buf: &mut [u8]) -> Result<[u8; TAG_LEN], TlsError> {
        let nonce = GenericArray::from_slice(nonce);
        let tag = match self {
            Aead::Aes128(aead) => aead.encrypt_in_place_detached(nonce, aad, buf),
            Aead::Aes256(aead) => aead.encrypt_in_place_detached(nonce, aad, buf),
            Aead::ChaCha20(aead) => aead.encrypt_in_place_detached(nonce, aad, buf),
        }
        .map_err(|_| TlsError::DecryptError)?;

        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&tag);
        Ok(out)
    }

    fn open(&self, nonce: &[u8; 12], aad: &[u8], buf: &mut [u8], tag: &[u8]) -> Result<(), TlsError> {
        let nonce = GenericArray::from_slice(nonce);
        let tag = GenericArray::from_slice(tag);
        match self {
            Aead::Aes128(aead) => aead.decrypt_in_place_detached(nonce, aad, buf, tag),
            Aead::Aes256(aead) => aead.decrypt_in_place_detached(nonce, aad, buf, tag),
            Aead::ChaCha20(aead) => aead.decrypt_in_place_detached(nonce, aad, buf, tag),
        }
        .map_err(|_| TlsError::BadRecordMac)
    }
}

/// Keys for one direction of an AEAD suite.  For TLS 1.2 GCM `iv`
/// holds the 4-byte salt; otherwise it is the full 12-byte nonce mask.
pub struct AeadDirection {
    aead: Aead,
    iv: [u8; 12],
}

impl AeadDirection {
    fn new(bulk: BulkAlgorithm, key: &[u8], iv: &[u8]) -> AeadDirection {
        let mut ret = AeadDirection {
            aead: Aead::new(bulk, key),
            iv: [0u8; 12],
        };
        ret.iv[..iv.len()].copy_from_slice(iv);
        ret
    }

    /// Nonce is iv_96 ^ (0_32 || seq_64).
    fn xor_nonce(&self, seq: u64) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        put_u64(seq, &mut nonce[4..]);
        xor(&mut nonce, &self.iv);
        nonce
    }

    /// Nonce is salt_32 || explicit_64.
    fn explicit_nonce(&self, explicit: &[u8]) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&self.iv[..4]);
        nonce[4..].copy_from_slice(explicit);
        nonce
    }
}

/// Keys for one direction of a CBC-HMAC suite.
pub struct CbcDirection {
    key: [u8; 32],
    key_len: usize,
    mac_key: [u8; 48],
    mac_key_len: usize,
}

impl CbcDirection {
    fn new(key: &[u8], mac_key: &[u8]) -> CbcDirection {
        let mut ret = CbcDirection {
            key: [0u8; 32],
            key_len: key.len(),
            mac_key: [0u8; 48],
            mac_key_len: mac_key.len(),
        };
        ret.key[..key.len()].copy_from_slice(key);
        ret.mac_key[..mac_key.len()].copy_from_slice(mac_key);
        ret
    }

    fn key(&self) -> &[u8] {
        &self.key[..self.key_len]
    }

    fn mac_key(&self) -> &[u8] {
        &self.mac_key[..self.mac_key_len]
    }
}

fn mac_len(mac: MacAlgorithm) -> usize {
    match mac {
        MacAlgorithm::HMAC_SHA1 => 20,
        MacAlgorithm::HMAC_SHA384 => 48,
        MacAlgorithm::NULL => 0,
    }
}

fn record_hmac(mac: MacAlgorithm, key: &[u8], seq: u64, typ: ContentType, body: &[u8]) -> ([u8; 48], usize) {
    let mut header = [0u8; TLS12_AAD_SIZE];
    make_tls12_aad(seq, typ, body.len(), &mut header);

    let mut out = [0u8; 48];
    let len = match mac {
        MacAlgorithm::HMAC_SHA1 => {
            let mut ctx = <Hmac<Sha1> as Mac>::new_from_slice(key).unwrap();
            ctx.update(&header);
            ctx.update(body);
            out[..20].copy_from_slice(&ctx.finalize().into_bytes());
            20
        }
        MacAlgorithm::HMAC_SHA384 => {
            let mut ctx = <Hmac<Sha384> as Mac>::new_from_slice(key).unwrap();
            ctx.update(&header);
            ctx.update(body);
            out[..48].copy_from_slice(&ctx.finalize().into_bytes());
            48
        }
        MacAlgorithm::NULL => unreachable!(),
    };
    (out, len)
}

fn cbc_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) {
    match key.len() {
        16 => {
            cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_mut::<NoPadding>(buf, buf.len())
                .unwrap();
        }
        32 => {
            cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_mut::<NoPadding>(buf, buf.len())
                .unwrap();
        }
        _ => unreachable!(),
    }
}

fn cbc_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), TlsError> {
    let result = match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .unwrap()
            .decrypt_padded_mut::<NoPadding>(buf)
            .map(|_| ()),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .unwrap()
            .decrypt_padded_mut::<NoPadding>(buf)
            .map(|_| ()),
        _ => unreachable!(),
    };
    result.map_err(|_| TlsError::BadRecordMac)
}

/// Record protection for one connection, over both directions.  We are
/// always the client, so the write half carries the client keys.
///
/// Sequence numbers belong to the caller: each protected record uses
/// the count of prior protected records on its direction.
pub enum MessageCipher {
    Tls12Gcm {
        write: AeadDirection,
        read: AeadDirection,
    },
    Tls12ChaCha {
        write: AeadDirection,
        read: AeadDirection,
    },
    Tls12Cbc {
        write: CbcDirection,
        read: CbcDirection,
        mac: MacAlgorithm,
        random: RandomSource,
    },
    Tls13 {
        write: AeadDirection,
        read: AeadDirection,
    },
}

impl MessageCipher {
    /// Cut the TLS 1.2 key block into per-direction MAC keys, cipher
    /// keys and IVs, and build the suite's cipher from them.
    pub fn new_tls12(
        scs: &SupportedCipherSuite,
        key_block: &[u8],
        random: RandomSource,
    ) -> MessageCipher {
        debug_assert_eq!(key_block.len(), scs.key_block_len());

        let mut offs = 0;
        let client_mac_key = &key_block[offs..offs + scs.mac_key_len];
        offs += scs.mac_key_len;
        let server_mac_key = &key_block[offs..offs + scs.mac_key_len];
        offs += scs.mac_key_len;
        let client_write_key = &key_block[offs..offs + scs.enc_key_len];
        offs += scs.enc_key_len;
        let server_write_key = &key_block[offs..offs + scs.enc_key_len];
        offs += scs.enc_key_len;
        let client_write_iv = &key_block[offs..offs + scs.fixed_iv_len];
        offs += scs.fixed_iv_len;
        let server_write_iv = &key_block[offs..offs + scs.fixed_iv_len];

        match scs.bulk {
            BulkAlgorithm::AES_128_GCM | BulkAlgorithm::AES_256_GCM => MessageCipher::Tls12Gcm {
                write: AeadDirection::new(scs.bulk, client_write_key, client_write_iv),
                read: AeadDirection::new(scs.bulk, server_write_key, server_write_iv),
            },
            BulkAlgorithm::CHACHA20_POLY1305 => MessageCipher::Tls12ChaCha {
                write: AeadDirection::new(scs.bulk, client_write_key, client_write_iv),
                read: AeadDirection::new(scs.bulk, server_write_key, server_write_iv),
            },
            BulkAlgorithm::AES_128_CBC | BulkAlgorithm::AES_256_CBC => MessageCipher::Tls12Cbc {
                write: CbcDirection::new(client_write_key, client_mac_key),
                read: CbcDirection::new(server_write_key, server_mac_key),
                mac: scs.mac,
                random,
            },
        }
    }

    /// Expand a pair of TLS 1.3 traffic secrets into keys and IVs.
    pub fn new_tls13(
        scs: &SupportedCipherSuite,
        client_secret: &[u8],
        server_secret: &[u8],
    ) -> MessageCipher {
        MessageCipher::Tls13 {
            write: AeadDirection::new(
                scs.bulk,
                &derive_traffic_key(scs.hash, client_secret, scs.enc_key_len),
                &derive_traffic_iv(scs.hash, client_secret, scs.fixed_iv_len),
            ),
            read: AeadDirection::new(
                scs.bulk,
                &derive_traffic_key(scs.hash, server_secret, scs.enc_key_len),
                &derive_traffic_iv(scs.hash, server_secret, scs.fixed_iv_len),
            ),
        }
    }

    /// Install a fresh read key after a key update.
    pub fn rekey_read(&mut self, scs: &SupportedCipherSuite, secret: &[u8]) {
        match self {
            MessageCipher::Tls13 { read, .. } => {
                *read = AeadDirection::new(
                    scs.bulk,
                    &derive_traffic_key(scs.hash, secret, scs.enc_key_len),
                    &derive_traffic_iv(scs.hash, secret, scs.fixed_iv_len),
                );
            }
            _ => unreachable!(),
        }
    }

    /// Install a fresh write key after a key update.
    pub fn rekey_write(&mut self, scs: &SupportedCipherSuite, secret: &[u8]) {
        match self {
            MessageCipher::Tls13 { write, .. } => {
                *write = AeadDirection::new(
                    scs.bulk,
                    &derive_traffic_key(scs.hash, secret, scs.enc_key_len),
                    &derive_traffic_iv(scs.hash, secret, scs.fixed_iv_len),
                );
            }
            _ => unreachable!(),
        }
    }

    /// Protect `plain` as one record into `out`, returning the total
    /// record length including the header.
    pub fn encrypt(
        &self,
        out: &mut [u8],
        seq: u64,
        typ: ContentType,
        plain: &[u8],
    ) -> Result<usize, TlsError> {
        debug_assert!(plain.len() <= MAX_FRAGMENT_LEN);

        let payload_len = match self {
            MessageCipher::Tls13 { write, .. } => {
                let inner_len = plain.len() + 1;
                let total = inner_len + TAG_LEN;
                if out.len() < HEADER_SIZE + total {
                    return Err(TlsError::BufferOverflow);
                }

                out[HEADER_SIZE..HEADER_SIZE + plain.len()].copy_from_slice(plain);
                out[HEADER_SIZE + plain.len()] = typ.get_u8();

                let mut aad = [0u8; TLS13_AAD_SIZE];
                make_tls13_aad(total, &mut aad);
                let nonce = write.xor_nonce(seq);
                let tag = write
                    .aead
                    .seal(&nonce, &aad, &mut out[HEADER_SIZE..HEADER_SIZE + inner_len])?;
                out[HEADER_SIZE + inner_len..HEADER_SIZE + total].copy_from_slice(&tag);
                total
            }

            MessageCipher::Tls12Gcm { write, .. } => {
                let total = GCM_EXPLICIT_NONCE_LEN + plain.len() + TAG_LEN;
                if out.len() < HEADER_SIZE + total {
                    return Err(TlsError::BufferOverflow);
                }

                // The explicit part of the nonce is the sequence
                // number itself, which satisfies uniqueness.
                put_u64(seq, &mut out[HEADER_SIZE..]);
                let explicit_end = HEADER_SIZE + GCM_EXPLICIT_NONCE_LEN;
                out[explicit_end..explicit_end + plain.len()].copy_from_slice(plain);

                let mut explicit = [0u8; GCM_EXPLICIT_NONCE_LEN];
                put_u64(seq, &mut explicit);
                let nonce = write.explicit_nonce(&explicit);

                let mut aad = [0u8; TLS12_AAD_SIZE];
                make_tls12_aad(seq, typ, plain.len(), &mut aad);

                let tag = write.aead.seal(
                    &nonce,
                    &aad,
                    &mut out[explicit_end..explicit_end + plain.len()],
                )?;
                out[explicit_end + plain.len()..explicit_end + plain.len() + TAG_LEN]
                    .copy_from_slice(&tag);
                total
            }

            MessageCipher::Tls12ChaCha { write, .. } => {
                let total = plain.len() + TAG_LEN;
                if out.len() < HEADER_SIZE + total {
                    return Err(TlsError::BufferOverflow);
                }

                out[HEADER_SIZE..HEADER_SIZE + plain.len()].copy_from_slice(plain);
                let nonce = write.xor_nonce(seq);
                let mut aad = [0u8; TLS12_AAD_SIZE];
                make_tls12_aad(seq, typ, plain.len(), &mut aad);

                let tag = write.aead.seal(
                    &nonce,
                    &aad,
                    &mut out[HEADER_SIZE..HEADER_SIZE + plain.len()],
                )?;
                out[HEADER_SIZE + plain.len()..HEADER_SIZE + total].copy_from_slice(&tag);
                total
            }

            MessageCipher::Tls12Cbc {
                write,
                mac,
                random,
                ..
            } => {
                let (mac_bytes, mac_len) = record_hmac(*mac, write.mac_key(), seq, typ, plain);
                let pad_len = CBC_BLOCK_LEN - ((plain.len() + mac_len) % CBC_BLOCK_LEN);
                let ct_len = plain.len() + mac_len + pad_len;
                let total = CBC_BLOCK_LEN + ct_len;
                if out.len() < HEADER_SIZE + total {
                    return Err(TlsError::BufferOverflow);
                }

                // Fresh random explicit IV for every record.
                let (iv, body) = out[HEADER_SIZE..HEADER_SIZE + total].split_at_mut(CBC_BLOCK_LEN);
                random(iv);

                body[..plain.len()].copy_from_slice(plain);
                body[plain.len()..plain.len() + mac_len].copy_from_slice(&mac_bytes[..mac_len]);
                for b in &mut body[plain.len() + mac_len..] {
                    *b = (pad_len - 1) as u8;
                }

                cbc_encrypt(write.key(), iv, body);
                total
            }
        };

        let outer_typ = match self {
            MessageCipher::Tls13 { .. } => ContentType::ApplicationData,
            _ => typ,
        };
        out[0] = outer_typ.get_u8();
        out[1] = 0x03;
        out[2] = 0x03;
        out[3] = (payload_len >> 8) as u8;
        out[4] = payload_len as u8;
        Ok(HEADER_SIZE + payload_len)
    }

    /// Unprotect one record payload in place, returning the real
    /// content type and where the plaintext landed inside `payload`.
    pub fn decrypt(
        &self,
        payload: &mut [u8],
        outer_typ: ContentType,
        seq: u64,
    ) -> Result<(ContentType, Range<usize>), TlsError> {
        match self {
            MessageCipher::Tls13 { read, .. } => {
                if payload.len() < TAG_LEN + 1 {
                    return Err(TlsError::DecryptError);
                }

                let mut aad = [0u8; TLS13_AAD_SIZE];
                make_tls13_aad(payload.len(), &mut aad);
                let nonce = read.xor_nonce(seq);

                let inner_len = payload.len() - TAG_LEN;
                let (inner, tag) = payload.split_at_mut(inner_len);
                read.aead.open(&nonce, &aad, inner, tag)?;

                // The real content type is the last non-zero byte;
                // everything after it is padding.
                let mut typ_at = inner_len;
                loop {
                    if typ_at == 0 {
                        return Err(TlsError::DecryptError);
                    }
                    typ_at -= 1;
                    if payload[typ_at] != 0 {
                        break;
                    }
                }

                let typ = match ContentType::read(&mut Reader::init(&payload[typ_at..typ_at + 1])) {
                    Some(ContentType::Unknown(_)) | None => return Err(TlsError::DecryptError),
                    Some(t) => t,
                };
                if typ_at > MAX_FRAGMENT_LEN {
                    return Err(TlsError::RecordOverflow);
                }
                Ok((typ, 0..typ_at))
            }

            MessageCipher::Tls12Gcm { read, .. } => {
                if payload.len() < GCM_EXPLICIT_NONCE_LEN + TAG_LEN {
                    return Err(TlsError::DecryptError);
                }

                let plain_len = payload.len() - GCM_EXPLICIT_NONCE_LEN - TAG_LEN;
                if plain_len > MAX_FRAGMENT_LEN {
                    return Err(TlsError::RecordOverflow);
                }

                let mut explicit = [0u8; GCM_EXPLICIT_NONCE_LEN];
                explicit.copy_from_slice(&payload[..GCM_EXPLICIT_NONCE_LEN]);
                let nonce = read.explicit_nonce(&explicit);

                let mut aad = [0u8; TLS12_AAD_SIZE];
                make_tls12_aad(seq, outer_typ, plain_len, &mut aad);

                let (ct, tag) = payload[GCM_EXPLICIT_NONCE_LEN..].split_at_mut(plain_len);
                read.aead.open(&nonce, &aad, ct, tag)?;
                Ok((
                    outer_typ,
                    GCM_EXPLICIT_NONCE_LEN..GCM_EXPLICIT_NONCE_LEN + plain_len,
                ))
            }

            MessageCipher::Tls12ChaCha { read, .. } => {
                if payload.len() < TAG_LEN {
                    return Err(TlsError::DecryptError);
                }

                let plain_len = payload.len() - TAG_LEN;
                if plain_len > MAX_FRAGMENT_LEN {
                    return Err(TlsError::RecordOverflow);
                }

                let nonce = read.xor_nonce(seq);
                let mut aad = [0u8; TLS12_AAD_SIZE];
                make_tls12_aad(seq, outer_typ, plain_len, &mut aad);

                let (ct, tag) = payload.split_at_mut(plain_len);
                read.aead.open(&nonce, &aad, ct, tag)?;
                Ok((outer_typ, 0..plain_len))
            }

            MessageCipher::Tls12Cbc { read, mac, .. } => {
                if payload.len() < CBC_BLOCK_LEN * 2
                    || (payload.len() - CBC_BLOCK_LEN) % CBC_BLOCK_LEN != 0
                {
                    return Err(TlsError::DecryptError);
                }

                let (iv, body) = payload.split_at_mut(CBC_BLOCK_LEN);
                cbc_decrypt(read.key(), iv, body)?;

                let pad_byte = body[body.len() - 1] as usize;
                let pad_len = pad_byte + 1;
                let mac_len = mac_len(*mac);
                if pad_len + mac_len > body.len() {
                    return Err(TlsError::BadRecordMac);
                }

                let mut pad_ok = 1u8;
                for &b in &body[body.len() - pad_len..] {
                    pad_ok &= u8::from(b == pad_byte as u8);
                }
                if pad_ok == 0 {
                    return Err(TlsError::BadRecordMac);
                }

                let plain_len = body.len() - pad_len - mac_len;
                if plain_len > MAX_FRAGMENT_LEN {
                    return Err(TlsError::RecordOverflow);
                }

                let (expect_mac, _) = record_hmac(
                    *mac,
                    read.mac_key(),
                    seq,
                    outer_typ,
                    &body[..plain_len],
                );
                let received = &body[plain_len..plain_len + mac_len];
                if !bool::from(received.ct_eq(&expect_mac[..mac_len])) {
                    return Err(TlsError::BadRecordMac);
                }

                Ok((outer_typ, CBC_BLOCK_LEN..CBC_BLOCK_LEN + plain_len))
            }
        }
    }
}
