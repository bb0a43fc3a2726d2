/// Key schedule maintenance for TLS 1.3.
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};
use zeroize::Zeroize;

use crate::msgs::enums::HashAlgorithm;

/// The kinds of secret we can extract from `KeySchedule`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SecretKind {
    ClientHandshakeTrafficSecret,
    ServerHandshakeTrafficSecret,
    ClientApplicationTrafficSecret,
    ServerApplicationTrafficSecret,
    DerivedSecret,
}

impl SecretKind {
    fn to_bytes(self) -> &'static [u8] {
        match self {
            SecretKind::ClientHandshakeTrafficSecret => b"c hs traffic",
            SecretKind::ServerHandshakeTrafficSecret => b"s hs traffic",
            SecretKind::ClientApplicationTrafficSecret => b"c ap traffic",
            SecretKind::ServerApplicationTrafficSecret => b"s ap traffic",
            SecretKind::DerivedSecret => b"derived",
        }
    }
}

/// The TLS 1.3 key schedule.  It stores the current secret and the type
/// of hash; each `input_secret` moves one extraction down the schedule.
pub struct KeySchedule {
    hash: HashAlgorithm,
    current: Vec<u8>,
    need_derive_for_extract: bool,
    hash_of_empty_message: Vec<u8>,
}

impl KeySchedule {
    pub fn new(hash: HashAlgorithm) -> KeySchedule {
        let zeroes = vec![0u8; hash_len(hash)];
        let empty_hash = match hash {
            HashAlgorithm::SHA256 => Sha256::digest(b"").to_vec(),
            HashAlgorithm::SHA384 => Sha384::digest(b"").to_vec(),
            _ => unreachable!(),
        };

        KeySchedule {
            hash,
            current: zeroes,
            need_derive_for_extract: false,
            hash_of_empty_message: empty_hash,
        }
    }

    /// Input the empty secret.
    pub fn input_empty(&mut self) {
        let zeroes = vec![0u8; hash_len(self.hash)];
        self.input_secret(&zeroes);
    }

    /// Input the given secret.
    pub fn input_secret(&mut self, secret: &[u8]) {
        if self.need_derive_for_extract {
            let derived = self.derive(SecretKind::DerivedSecret, &self.hash_of_empty_message.clone());
            self.current = derived;
        }
        self.need_derive_for_extract = true;

        let new = match self.hash {
            HashAlgorithm::SHA256 => Hkdf::<Sha256>::extract(Some(&self.current), secret)
                .0
                .to_vec(),
            HashAlgorithm::SHA384 => Hkdf::<Sha384>::extract(Some(&self.current), secret)
                .0
                .to_vec(),
            _ => unreachable!(),
        };
        self.current.zeroize();
        self.current = new;
    }

    /// Derive a secret of given `kind`, using current handshake hash
    /// `hs_hash`.
    pub fn derive(&self, kind: SecretKind, hs_hash: &[u8]) -> Vec<u8> {
        debug_assert_eq!(hs_hash.len(), hash_len(self.hash));

        hkdf_expand_label_vec(
            self.hash,
            &self.current,
            kind.to_bytes(),
            hs_hash,
            hash_len(self.hash),
        )
    }

    /// Sign the finished message consisting of `hs_hash` using the key
    /// material `base_key`.
    pub fn sign_verify_data(&self, base_key: &[u8], hs_hash: &[u8]) -> Vec<u8> {
        debug_assert_eq!(hs_hash.len(), hash_len(self.hash));

        let hmac_key = hkdf_expand_label_vec(
            self.hash,
            base_key,
            b"finished",
            &[],
            hash_len(self.hash),
        );
        hmac_hash(self.hash, &hmac_key, hs_hash)
    }
}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        self.current.zeroize();
    }
}

pub fn hash_len(hash: HashAlgorithm) -> usize {
    match hash {
        HashAlgorithm::SHA256 => 32,
        HashAlgorithm::SHA384 => 48,
        _ => unreachable!(),
    }
}

fn hmac_hash(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::SHA256 => {
            let mut ctx = Hmac::<Sha256>::new_from_slice(key).unwrap();
            ctx.update(data);
            ctx.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::SHA384 => {
            let mut ctx = Hmac::<Sha384>::new_from_slice(key).unwrap();
            ctx.update(data);
            ctx.finalize().into_bytes().to_vec()
        }
        _ => unreachable!(),
    }
}

fn hkdf_expand_label_vec(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    len: usize,
) -> Vec<u8> {
    let mut v = vec![0u8; len];
    hkdf_expand_label(&mut v, hash, secret, label, context);
    v
}

fn hkdf_expand_label(output: &mut [u8], hash: HashAlgorithm, secret: &[u8], label: &[u8], context: &[u8]) {
    let label_prefix = b"tls13 ";

    let mut hkdflabel = Vec::with_capacity(2 + 1 + label_prefix.len() + label.len() + 1 + context.len());
    hkdflabel.extend_from_slice(&(output.len() as u16).to_be_bytes());
    hkdflabel.push((label.len() + label_prefix.len()) as u8);
    hkdflabel.extend_from_slice(label_prefix);
    hkdflabel.extend_from_slice(label);
    hkdflabel.push(context.len() as u8);
    hkdflabel.extend_from_slice(context);

    match hash {
        HashAlgorithm::SHA256 => Hkdf::<Sha256>::from_prk(secret)
            .unwrap()
            .expand(&hkdflabel, output)
            .unwrap(),
        HashAlgorithm::SHA384 => Hkdf::<Sha384>::from_prk(secret)
            .unwrap()
            .expand(&hkdflabel, output)
            .unwrap(),
        _ => unreachable!(),
    }
}

pub fn derive_traffic_key(hash: HashAlgorithm, secret: &[u8], len: usize) -> Vec<u8> {
    hkdf_expand_label_vec(hash, secret, b"key", &[], len)
}

pub fn derive_traffic_iv(hash: HashAlgorithm, secret: &[u8], len: usize) -> Vec<u8> {
    hkdf_expand_label_vec(hash, secret, b"iv", &[], len)
}

/// The next generation of a traffic secret, for key updates.
pub fn derive_next_secret(hash: HashAlgorithm, secret: &[u8]) -> Vec<u8> {
    hkdf_expand_label_vec(hash, secret, b"traffic upd", &[], hash_len(hash))
}
