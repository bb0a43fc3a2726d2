use std::io;

use log::{debug, warn};
use subtle::ConstantTimeEq;

use crate::cipher::MessageCipher;
use crate::client::{ClientConfig, ClientSession, NegotiatedStats, Tls13Traffic};
use crate::error::TlsError;
use crate::hash_hs::HandshakeHash;
use crate::key_schedule::{KeySchedule, SecretKind};
use crate::kx::{self, KeyPairs, MAX_SERVER_SHARE_LEN};
use crate::msgs::codec::{read_u16, read_u24, read_u8, Codec, Reader, Writer};
use crate::msgs::deframer::{RecordReader, MAX_WIRE_SIZE};
use crate::msgs::enums::{
    AlertDescription, AlertLevel, CipherSuite, ContentType, ECCurveType, ECPointFormat,
    ExtensionType, HandshakeType, NamedGroup, ProtocolVersion, SignatureScheme,
};
use crate::prf::SessionSecrets;
use crate::suites::{find_suite, KeyExchangeAlgorithm, SupportedCipherSuite};
use crate::verify;

/// ServerHello.random value that actually means HelloRetryRequest.
const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8,
    0x91, 0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8,
    0x33, 0x9c,
];

/// Refuse to buffer handshake messages beyond this.
const MAX_HANDSHAKE_MESSAGE: usize = 0x1_0000;

static ALL_SIGNATURE_SCHEMES: [SignatureScheme; 9] = [
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
    SignatureScheme::RSA_PSS_SHA256,
    SignatureScheme::RSA_PSS_SHA384,
    SignatureScheme::RSA_PSS_SHA512,
    SignatureScheme::ED25519,
    SignatureScheme::RSA_PKCS1_SHA1,
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA384,
];

struct HandshakeDetails {
    client_random: [u8; 32],
    server_random: [u8; 32],
    transcript: HandshakeHash,
    suite: Option<&'static SupportedCipherSuite>,
    version: ProtocolVersion,
    named_group: Option<NamedGroup>,
    server_pub_key: Vec<u8>,
    sig_scheme: Option<SignatureScheme>,
    cert_pub_key: Option<verify::CertPublicKey>,
    kx: KeyPairs,
    rsa_pre_master: [u8; 48],
    offer_tls12: bool,
    offer_tls13: bool,
}

/// Reassembles handshake messages out of record payloads.  One record
/// may carry several messages, and (after ServerHello, in TLS 1.3) one
/// message may span several records.
struct HandshakeJoiner {
    buf: Vec<u8>,
    offs: usize,
}

impl HandshakeJoiner {
    fn new() -> HandshakeJoiner {
        HandshakeJoiner {
            buf: Vec::new(),
            offs: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.offs == self.buf.len()
    }

    fn extend(&mut self, bytes: &[u8]) {
        if self.offs > 0 {
            self.buf.drain(..self.offs);
            self.offs = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    fn next_message(&mut self) -> Result<Option<(HandshakeType, Vec<u8>)>, TlsError> {
        let mut r = Reader::init(&self.buf[self.offs..]);
        let typ = match HandshakeType::read(&mut r) {
            Some(t) => t,
            None => return Ok(None),
        };
        let len = match read_u24(&mut r) {
            Some(l) => l as usize,
            None => return Ok(None),
        };
        if len > MAX_HANDSHAKE_MESSAGE {
            return Err(TlsError::DecodeError);
        }
        let body = match r.take(len) {
            Some(b) => b.to_vec(),
            None => return Ok(None),
        };

        self.offs += 4 + len;
        Ok(Some((typ, body)))
    }
}

fn alert_error(payload: &[u8]) -> TlsError {
    let mut r = Reader::init(payload);
    let (level, desc) = match (AlertLevel::read(&mut r), AlertDescription::read(&mut r)) {
        (Some(level), Some(desc)) => (level, desc),
        _ => return TlsError::DecodeError,
    };
    warn!("received {:?} alert: {:?}", level, desc);
    TlsError::AlertReceived(desc)
}

/// Update the transcript with one handshake message, reconstructing
/// the four header bytes the joiner consumed.
fn transcript_update(transcript: &mut HandshakeHash, typ: HandshakeType, body: &[u8]) {
    let len = body.len() as u32;
    let header = [
        typ.get_u8(),
        (len >> 16) as u8,
        (len >> 8) as u8,
        len as u8,
    ];
    transcript.update(&header);
    transcript.update(body);
}

/// Run a full client handshake over `sock` and hand back the
/// established session.
pub(crate) fn perform<T: io::Read + io::Write>(
    mut config: ClientConfig,
    sock: &mut T,
) -> Result<ClientSession, TlsError> {
    if config.cipher_suites.is_empty() {
        return Err(TlsError::IllegalParameter);
    }

    // All the randomness this handshake will ever need, in one draw:
    // the client random, the key-pair seed, and the key-transport
    // filler.
    let mut randoms = [0u8; 142];
    (config.random)(&mut randoms);

    let mut client_random = [0u8; 32];
    client_random.copy_from_slice(&randoms[..32]);
    let mut seed = [0u8; 64];
    seed.copy_from_slice(&randoms[32..96]);
    let mut rsa_random = [0u8; 46];
    rsa_random.copy_from_slice(&randoms[96..142]);

    let mut hs = HandshakeDetails {
        client_random,
        server_random: [0u8; 32],
        transcript: HandshakeHash::new(),
        suite: None,
        version: ProtocolVersion::TLSv1_2,
        named_group: None,
        server_pub_key: Vec::new(),
        sig_scheme: None,
        cert_pub_key: None,
        kx: KeyPairs::generate(&seed)?,
        rsa_pre_master: kx::rsa_pre_master(&rsa_random),
        offer_tls12: config.cipher_suites.iter().any(|scs| !scs.tls13()),
        offer_tls13: config.cipher_suites.iter().any(|scs| scs.tls13()),
    };

    let mut out = [0u8; MAX_WIRE_SIZE];
    emit_client_hello(&mut hs, &config, &mut out, sock)?;

    let mut deframer = RecordReader::new();
    let mut joiner = HandshakeJoiner::new();

    let (typ, body) = next_plain_message(&mut deframer, &mut joiner, sock)?;
    if typ != HandshakeType::ServerHello {
        return Err(TlsError::UnexpectedMessage);
    }
    handle_server_hello(&mut hs, &config, &body)?;
    transcript_update(&mut hs.transcript, typ, &body);
    let suite = hs.suite.unwrap();
    hs.transcript.pick(suite.hash);
    debug!(
        "negotiated {:?} with {:?}",
        hs.version, suite.suite
    );

    let now = config.now();
    let (cipher, client_seq, server_seq, traffic) = if hs.version == ProtocolVersion::TLSv1_3 {
        do_tls13_flight(&mut hs, &config, &mut deframer, &mut joiner, &mut out, sock, now)?
    } else {
        do_tls12_flight(&mut hs, &config, &mut deframer, &mut joiner, &mut out, sock, now)?
    };

    let negotiated = NegotiatedStats {
        version: hs.version,
        cipher_suite: suite.suite,
        named_group: hs.named_group.unwrap_or(NamedGroup::Unknown(0)),
        signature_scheme: hs.sig_scheme.unwrap_or(SignatureScheme::Unknown(0)),
    };
    if let Some(sink) = config.stats.take() {
        *sink = negotiated.clone();
    }

    Ok(ClientSession::from_handshake(
        cipher, suite, hs.version, deframer, client_seq, server_seq, traffic, negotiated,
    ))
}

fn emit_client_hello<T: io::Write>(
    hs: &mut HandshakeDetails,
    config: &ClientConfig,
    out: &mut [u8; MAX_WIRE_SIZE],
    sock: &mut T,
) -> Result<(), TlsError> {
    let mut groups = vec![
        NamedGroup::X25519,
        NamedGroup::secp256r1,
        NamedGroup::secp384r1,
    ];
    if hs.offer_tls13 && !config.disable_hybrid_kex {
        groups.push(NamedGroup::X25519Kyber768Draft00);
    }

    let kx = &hs.kx;
    let offer_tls12 = hs.offer_tls12;
    let offer_tls13 = hs.offer_tls13;

    let mut w = Writer::new(&mut out[..]);
    w.put_u8(ContentType::Handshake.get_u8())?;
    // The first flight traditionally claims TLS 1.0 in the record
    // header; everything after it must claim 1.2.
    w.put_u16(ProtocolVersion::TLSv1_0.get_u16())?;
    w.lengthed_u16(|w| {
        w.put_u8(HandshakeType::ClientHello.get_u8())?;
        w.lengthed_u24(|w| {
            w.put_u16(ProtocolVersion::TLSv1_2.get_u16())?;
            w.put_bytes(&hs.client_random)?;
            w.put_u8(0)?; // no legacy session id
            w.lengthed_u16(|w| {
                for scs in config.cipher_suites {
                    w.put_u16(scs.suite.get_u16())?;
                }
                Ok(())
            })?;
            w.put_u8(1)?;
            w.put_u8(0)?; // null compression only

            w.lengthed_u16(|w| {
                if offer_tls13 {
                    w.extension(ExtensionType::SupportedVersions, |w| {
                        w.lengthed_u8(|w| {
                            w.put_u16(ProtocolVersion::TLSv1_3.get_u16())?;
                            if offer_tls12 {
                                w.put_u16(ProtocolVersion::TLSv1_2.get_u16())?;
                            }
                            Ok(())
                        })
                    })?;
                }

                w.extension(ExtensionType::ECPointFormats, |w| {
                    w.lengthed_u8(|w| w.put_u8(ECPointFormat::Uncompressed.get_u8()))
                })?;
                w.extension(ExtensionType::RenegotiationInfo, |w| w.put_u8(0))?;
                w.extension(ExtensionType::SCT, |_| Ok(()))?;

                w.extension(ExtensionType::SignatureAlgorithms, |w| {
                    let schemes: Vec<u16> =
                        ALL_SIGNATURE_SCHEMES.iter().map(|s| s.get_u16()).collect();
                    w.put_u16_list(&schemes)
                })?;

                w.extension(ExtensionType::SupportedGroups, |w| {
                    let ids: Vec<u16> = groups.iter().map(|g| g.get_u16()).collect();
                    w.put_u16_list(&ids)
                })?;

                if offer_tls13 {
                    w.extension(ExtensionType::KeyShare, |w| {
                        w.lengthed_u16(|w| {
                            for group in &groups {
                                let pubkey = kx.public_key(*group)?;
                                w.key_share_entry(*group, &pubkey)?;
                            }
                            Ok(())
                        })
                    })?;
                }

                w.sni_extension(config.host)
            })
        })
    })?;

    let total = w.used();
    hs.transcript.update(&out[5..total]);
    sock.write_all(&out[..total])?;
    Ok(())
}

/// Read the next plaintext handshake message.  Coalesced messages in
/// one record are fine; a message spanning records is not tolerated on
/// the plaintext paths.
fn next_plain_message<T: io::Read>(
    deframer: &mut RecordReader,
    joiner: &mut HandshakeJoiner,
    sock: &mut T,
) -> Result<(HandshakeType, Vec<u8>), TlsError> {
    if let Some(msg) = joiner.next_message()? {
        return Ok(msg);
    }
    if !joiner.is_empty() {
        return Err(TlsError::UnsupportedFragmentedHandshakeMessage);
    }

    let meta = deframer
        .next_record(sock)?
        .ok_or(TlsError::EndOfStream)?;
    if meta.version != ProtocolVersion::TLSv1_2 {
        return Err(TlsError::BadVersion);
    }
    match meta.typ {
        ContentType::Handshake => {
            let payload = &deframer.buf()[meta.payload];
            joiner.extend(payload);
            joiner
                .next_message()?
                .ok_or(TlsError::UnsupportedFragmentedHandshakeMessage)
        }
        ContentType::Alert => Err(alert_error(&deframer.buf()[meta.payload])),
        _ => Err(TlsError::UnexpectedMessage),
    }
}

fn handle_server_hello(
    hs: &mut HandshakeDetails,
    config: &ClientConfig,
    body: &[u8],
) -> Result<(), TlsError> {
    let mut r = Reader::init(body);

    let legacy_version = read_u16(&mut r).ok_or(TlsError::DecodeError)?;
    if legacy_version != ProtocolVersion::TLSv1_2.get_u16() {
        return Err(TlsError::BadVersion);
    }

    let random = r.take(32).ok_or(TlsError::DecodeError)?;
    if random == HELLO_RETRY_REQUEST_RANDOM {
        return Err(TlsError::ServerHelloRetryRequest);
    }
    hs.server_random.copy_from_slice(random);

    // Legacy session id echo: accepted and ignored.
    let session_id = r.take_vec_u8().ok_or(TlsError::DecodeError)?;
    if session_id.len() > 32 {
        return Err(TlsError::DecodeError);
    }

    let suite = CipherSuite::read(&mut r).ok_or(TlsError::DecodeError)?;
    if !config.cipher_suites.iter().any(|scs| scs.suite == suite) {
        return Err(TlsError::IllegalParameter);
    }
    let scs = find_suite(suite).ok_or(TlsError::IllegalParameter)?;
    hs.suite = Some(scs);

    let compression = read_u8(&mut r).ok_or(TlsError::DecodeError)?;
    if compression != 0 {
        return Err(TlsError::IllegalParameter);
    }

    if r.any_left() {
        let len = read_u16(&mut r).ok_or(TlsError::DecodeError)? as usize;
        let mut exts = r.sub(len).ok_or(TlsError::DecodeError)?;
        r.expect_empty()?;

        while exts.any_left() {
            let typ = ExtensionType::read(&mut exts).ok_or(TlsError::DecodeError)?;
            let body = exts.take_vec_u16().ok_or(TlsError::DecodeError)?;
            let mut ext = Reader::init(body);

            match typ {
                ExtensionType::SupportedVersions => {
                    let selected = read_u16(&mut ext).ok_or(TlsError::DecodeError)?;
                    if selected != ProtocolVersion::TLSv1_3.get_u16() || !hs.offer_tls13 {
                        return Err(TlsError::BadVersion);
                    }
                    hs.version = ProtocolVersion::TLSv1_3;
                }
                ExtensionType::KeyShare => {
                    let group = NamedGroup::read(&mut ext).ok_or(TlsError::DecodeError)?;
                    let offered = matches!(
                        group,
                        NamedGroup::X25519
                            | NamedGroup::secp256r1
                            | NamedGroup::secp384r1
                            | NamedGroup::X25519Kyber768Draft00
                    );
                    if !offered
                        || (group == NamedGroup::X25519Kyber768Draft00
                            && config.disable_hybrid_kex)
                    {
                        return Err(TlsError::IllegalParameter);
                    }
                    let key = ext.take_vec_u16().ok_or(TlsError::DecodeError)?;
                    if key.is_empty() || key.len() > MAX_SERVER_SHARE_LEN {
                        return Err(TlsError::IllegalParameter);
                    }
                    hs.named_group = Some(group);
                    hs.server_pub_key = key.to_vec();
                }
                _ => (), // tolerated and ignored
            }
        }
    } else {
        r.expect_empty()?;
    }

    // The suite family must agree with the negotiated version.
    if scs.tls13() != (hs.version == ProtocolVersion::TLSv1_3) {
        return Err(TlsError::IllegalParameter);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn do_tls13_flight<T: io::Read + io::Write>(
    hs: &mut HandshakeDetails,
    config: &ClientConfig,
    deframer: &mut RecordReader,
    joiner: &mut HandshakeJoiner,
    out: &mut [u8; MAX_WIRE_SIZE],
    sock: &mut T,
    now: u64,
) -> Result<(MessageCipher, u64, u64, Option<Tls13Traffic>), TlsError> {
    let suite = hs.suite.unwrap();

    let group = hs.named_group.ok_or(TlsError::DecodeError)?;
    if hs.server_pub_key.is_empty() {
        return Err(TlsError::DecodeError);
    }
    let shared = hs.kx.shared_secret(group, &hs.server_pub_key)?;

    let mut ks = KeySchedule::new(suite.hash);
    ks.input_empty();
    ks.input_secret(&shared);

    let hs_hash = hs.transcript.current();
    let client_hs_secret = ks.derive(SecretKind::ClientHandshakeTrafficSecret, &hs_hash);
    let server_hs_secret = ks.derive(SecretKind::ServerHandshakeTrafficSecret, &hs_hash);
    let hs_cipher = MessageCipher::new_tls13(suite, &client_hs_secret, &server_hs_secret);
    let mut read_seq = 0u64;

    let expected = [
        HandshakeType::EncryptedExtensions,
        HandshakeType::Certificate,
        HandshakeType::CertificateVerify,
        HandshakeType::Finished,
    ];

    for want in expected {
        let (typ, body) =
            next_encrypted_message(deframer, joiner, sock, &hs_cipher, &mut read_seq)?;
        if typ != want {
            return Err(TlsError::UnexpectedMessage);
        }

        // Signatures and MACs cover the transcript up to, but not
        // including, the message that carries them.
        let hash_before = hs.transcript.current();

        match typ {
            HandshakeType::EncryptedExtensions => {
                let mut r = Reader::init(&body);
                r.take_vec_u16().ok_or(TlsError::DecodeError)?;
                r.expect_empty()?;
                debug!("got EncryptedExtensions");
            }

            HandshakeType::Certificate => {
                let mut r = Reader::init(&body);
                let context = r.take_vec_u8().ok_or(TlsError::DecodeError)?;
                if !context.is_empty() {
                    return Err(TlsError::IllegalParameter);
                }

                let mut chain = Vec::new();
                let mut list = {
                    let len = read_u24(&mut r).ok_or(TlsError::DecodeError)? as usize;
                    r.sub(len).ok_or(TlsError::DecodeError)?
                };
                r.expect_empty()?;
                while list.any_left() {
                    let cert = list.take_vec_u24().ok_or(TlsError::DecodeError)?;
                    // per-certificate extensions, ignored
                    list.take_vec_u16().ok_or(TlsError::DecodeError)?;
                    chain.push(cert.to_vec());
                }
                debug!("got Certificate chain of {}", chain.len());

                let key =
                    verify::verify_server_chain(&chain, config.host, config.root_store, now)?;
                hs.cert_pub_key = Some(key);
            }

            HandshakeType::CertificateVerify => {
                let mut r = Reader::init(&body);
                let scheme =
                    SignatureScheme::read(&mut r).ok_or(TlsError::DecodeError)?;
                if !ALL_SIGNATURE_SCHEMES.contains(&scheme) {
                    return Err(TlsError::UnknownSignatureScheme);
                }
                let sig = r.take_vec_u16().ok_or(TlsError::DecodeError)?;
                r.expect_empty()?;

                let message = verify::tls13_verify_bytes(&hash_before);
                let key = hs.cert_pub_key.as_ref().ok_or(TlsError::UnexpectedMessage)?;
                verify::verify_signed(scheme, key, &message, sig)?;
                hs.sig_scheme = Some(scheme);
                debug!("CertificateVerify ok, scheme {:?}", scheme);
            }

            HandshakeType::Finished => {
                let expect = ks.sign_verify_data(&server_hs_secret, &hash_before);
                if !bool::from(expect.as_slice().ct_eq(&body)) {
                    return Err(TlsError::DecryptError);
                }
                debug!("server Finished verified");
            }

            _ => unreachable!(),
        }

        transcript_update(&mut hs.transcript, typ, &body);
    }

    // Application secrets cover the transcript through server
    // Finished.
    ks.input_empty();
    let ap_hash = hs.transcript.current();
    let client_ap_secret = ks.derive(SecretKind::ClientApplicationTrafficSecret, &ap_hash);
    let server_ap_secret = ks.derive(SecretKind::ServerApplicationTrafficSecret, &ap_hash);

    // Legacy ChangeCipherSpec for middlebox compatibility.
    sock.write_all(&[0x14, 0x03, 0x03, 0x00, 0x01, 0x01])?;

    // Client Finished, under the handshake keys.
    let verify_data = ks.sign_verify_data(&client_hs_secret, &hs.transcript.current());
    let mut msg = Vec::with_capacity(4 + verify_data.len());
    msg.push(HandshakeType::Finished.get_u8());
    msg.extend_from_slice(&(verify_data.len() as u32).to_be_bytes()[1..]);
    msg.extend_from_slice(&verify_data);
    hs.transcript.update(&msg);

    let n = hs_cipher.encrypt(&mut out[..], 0, ContentType::Handshake, &msg)?;
    sock.write_all(&out[..n])?;

    let app_cipher = MessageCipher::new_tls13(suite, &client_ap_secret, &server_ap_secret);
    let traffic = Tls13Traffic {
        client_secret: client_ap_secret,
        server_secret: server_ap_secret,
    };

    Ok((app_cipher, 0, 0, Some(traffic)))
}

/// Read the next handshake message from the encrypted part of the
/// server flight, defragmenting across records as needed.
fn next_encrypted_message<T: io::Read>(
    deframer: &mut RecordReader,
    joiner: &mut HandshakeJoiner,
    sock: &mut T,
    cipher: &MessageCipher,
    read_seq: &mut u64,
) -> Result<(HandshakeType, Vec<u8>), TlsError> {
    loop {
        if let Some(msg) = joiner.next_message()? {
            return Ok(msg);
        }

        let meta = deframer
            .next_record(sock)?
            .ok_or(TlsError::EndOfStream)?;
        if meta.version != ProtocolVersion::TLSv1_2 {
            return Err(TlsError::BadVersion);
        }

        match meta.typ {
            // The server's compatibility ChangeCipherSpec; carried in
            // the clear and ignored.
            ContentType::ChangeCipherSpec => continue,
            ContentType::Alert => {
                return Err(alert_error(&deframer.buf()[meta.payload]));
            }
            ContentType::ApplicationData => {
                let range = meta.payload.clone();
                let payload = &mut deframer.buf_mut()[range.clone()];
                let (typ, inner) = cipher.decrypt(payload, meta.typ, *read_seq)?;
                *read_seq += 1;

                match typ {
                    ContentType::Handshake => {
                        let start = range.start + inner.start;
                        let end = range.start + inner.end;
                        joiner.extend(&deframer.buf()[start..end]);
                    }
                    ContentType::Alert => {
                        let start = range.start + inner.start;
                        let end = range.start + inner.end;
                        return Err(alert_error(&deframer.buf()[start..end]));
                    }
                    _ => return Err(TlsError::UnexpectedMessage),
                }
            }
            ContentType::Handshake | ContentType::Unknown(_) => {
                return Err(TlsError::UnexpectedMessage)
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn do_tls12_flight<T: io::Read + io::Write>(
    hs: &mut HandshakeDetails,
    config: &ClientConfig,
    deframer: &mut RecordReader,
    joiner: &mut HandshakeJoiner,
    out: &mut [u8; MAX_WIRE_SIZE],
    sock: &mut T,
    now: u64,
) -> Result<(MessageCipher, u64, u64, Option<Tls13Traffic>), TlsError> {
    let suite = hs.suite.unwrap();

    // Certificate
    let (typ, body) = next_plain_message(deframer, joiner, sock)?;
    if typ != HandshakeType::Certificate {
        return Err(TlsError::UnexpectedMessage);
    }
    let mut r = Reader::init(&body);
    let mut chain = Vec::new();
    let mut list = {
        let len = read_u24(&mut r).ok_or(TlsError::DecodeError)? as usize;
        r.sub(len).ok_or(TlsError::DecodeError)?
    };
    r.expect_empty()?;
    while list.any_left() {
        let cert = list.take_vec_u24().ok_or(TlsError::DecodeError)?;
        chain.push(cert.to_vec());
    }
    debug!("got Certificate chain of {}", chain.len());
    let key = verify::verify_server_chain(&chain, config.host, config.root_store, now)?;
    hs.cert_pub_key = Some(key);
    transcript_update(&mut hs.transcript, typ, &body);

    // ServerKeyExchange, for the ECDHE suites.
    if suite.kx == KeyExchangeAlgorithm::ECDHE {
        let (typ, body) = next_plain_message(deframer, joiner, sock)?;
        if typ != HandshakeType::ServerKeyExchange {
            return Err(TlsError::UnexpectedMessage);
        }
        let mut r = Reader::init(&body);

        let curve_type = read_u8(&mut r).ok_or(TlsError::DecodeError)?;
        if curve_type != ECCurveType::NamedCurve.get_u8() {
            return Err(TlsError::IllegalParameter);
        }
        let group = NamedGroup::read(&mut r).ok_or(TlsError::DecodeError)?;
        if !matches!(
            group,
            NamedGroup::X25519 | NamedGroup::secp256r1 | NamedGroup::secp384r1
        ) {
            return Err(TlsError::IllegalParameter);
        }
        let server_pub = r.take_vec_u8().ok_or(TlsError::DecodeError)?;
        if server_pub.is_empty() {
            return Err(TlsError::IllegalParameter);
        }
        let scheme = SignatureScheme::read(&mut r).ok_or(TlsError::DecodeError)?;
        if !ALL_SIGNATURE_SCHEMES.contains(&scheme) {
            return Err(TlsError::UnknownSignatureScheme);
        }
        let sig = r.take_vec_u16().ok_or(TlsError::DecodeError)?;
        r.expect_empty()?;

        hs.named_group = Some(group);
        hs.server_pub_key = server_pub.to_vec();
        hs.sig_scheme = Some(scheme);

        let message = verify::tls12_kx_verify_bytes(
            &hs.client_random,
            &hs.server_random,
            group,
            server_pub,
        );
        let key = hs.cert_pub_key.as_ref().unwrap();
        verify::verify_signed(scheme, key, &message, sig)?;
        debug!("ServerKeyExchange signature ok, scheme {:?}", scheme);

        transcript_update(&mut hs.transcript, typ, &body);
    }

    // ServerHelloDone
    let (typ, body) = next_plain_message(deframer, joiner, sock)?;
    if typ != HandshakeType::ServerHelloDone {
        return Err(TlsError::UnexpectedMessage);
    }
    if !body.is_empty() {
        return Err(TlsError::DecodeError);
    }
    transcript_update(&mut hs.transcript, typ, &body);

    // ClientKeyExchange, and the pre-master secret it transports or
    // agrees.
    let mut cke = Vec::new();
    let pre_master = match suite.kx {
        KeyExchangeAlgorithm::ECDHE => {
            let group = hs.named_group.unwrap();
            let pre_master = hs.kx.shared_secret(group, &hs.server_pub_key)?;
            let pubkey = hs.kx.public_key(group)?;
            cke.push(pubkey.len() as u8);
            cke.extend_from_slice(&pubkey);
            pre_master
        }
        KeyExchangeAlgorithm::RSA => {
            let key = hs.cert_pub_key.as_ref().unwrap();
            let wrapped = kx::encrypt_rsa_pre_master(&hs.rsa_pre_master, key, config.random)?;
            cke.extend_from_slice(&(wrapped.len() as u16).to_be_bytes());
            cke.extend_from_slice(&wrapped);
            hs.rsa_pre_master.to_vec()
        }
    };

    let mut w = Writer::new(&mut out[..]);
    w.put_u8(ContentType::Handshake.get_u8())?;
    w.put_u16(ProtocolVersion::TLSv1_2.get_u16())?;
    w.lengthed_u16(|w| {
        w.put_u8(HandshakeType::ClientKeyExchange.get_u8())?;
        w.lengthed_u24(|w| w.put_bytes(&cke))
    })?;
    let total = w.used();
    hs.transcript.update(&out[5..total]);
    sock.write_all(&out[..total])?;

    // Key derivation, then we switch on our write protection.
    let secrets = SessionSecrets::new(
        &hs.client_random,
        &hs.server_random,
        suite.hash,
        &pre_master,
    );
    let key_block = secrets.make_key_block(suite.key_block_len());
    let cipher = MessageCipher::new_tls12(suite, &key_block, config.random);

    sock.write_all(&[0x14, 0x03, 0x03, 0x00, 0x01, 0x01])?;

    let verify_data = secrets.client_verify_data(&hs.transcript.current());
    let mut finished = Vec::with_capacity(16);
    finished.push(HandshakeType::Finished.get_u8());
    finished.extend_from_slice(&[0x00, 0x00, 0x0c]);
    finished.extend_from_slice(&verify_data);
    hs.transcript.update(&finished);

    let n = cipher.encrypt(&mut out[..], 0, ContentType::Handshake, &finished)?;
    sock.write_all(&out[..n])?;

    // Server ChangeCipherSpec.
    let meta = deframer
        .next_record(sock)?
        .ok_or(TlsError::EndOfStream)?;
    if meta.version != ProtocolVersion::TLSv1_2 {
        return Err(TlsError::BadVersion);
    }
    match meta.typ {
        ContentType::ChangeCipherSpec => {
            if &deframer.buf()[meta.payload] != &[0x01][..] {
                return Err(TlsError::DecodeError);
            }
        }
        ContentType::Alert => return Err(alert_error(&deframer.buf()[meta.payload])),
        _ => return Err(TlsError::UnexpectedMessage),
    }

    // Server Finished, under the new keys.
    let meta = deframer
        .next_record(sock)?
        .ok_or(TlsError::EndOfStream)?;
    if meta.version != ProtocolVersion::TLSv1_2 {
        return Err(TlsError::BadVersion);
    }
    if meta.typ != ContentType::Handshake {
        return Err(TlsError::UnexpectedMessage);
    }
    let range = meta.payload.clone();
    let payload = &mut deframer.buf_mut()[range.clone()];
    let (typ, inner) = cipher.decrypt(payload, meta.typ, 0)?;
    if typ != ContentType::Handshake {
        return Err(TlsError::UnexpectedMessage);
    }

    let plain = &deframer.buf()[range.start + inner.start..range.start + inner.end];
    let mut r = Reader::init(plain);
    let msg_typ = HandshakeType::read(&mut r).ok_or(TlsError::DecodeError)?;
    let len = read_u24(&mut r).ok_or(TlsError::DecodeError)? as usize;
    let body = r.take(len).ok_or(TlsError::DecodeError)?;
    r.expect_empty()?;
    if msg_typ != HandshakeType::Finished || len != 12 {
        return Err(TlsError::UnexpectedMessage);
    }

    let expect = secrets.server_verify_data(&hs.transcript.current());
    if !bool::from(expect[..].ct_eq(body)) {
        return Err(TlsError::DecryptError);
    }
    debug!("server Finished verified");
    hs.transcript.update(plain);

    // Our Finished used client sequence 0; the server's used server
    // sequence 0.  Application traffic continues from there.
    Ok((cipher, 1, 1, None))
}
