use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384};
use zeroize::Zeroize;

use crate::msgs::enums::HashAlgorithm;

fn p_hash<M: Mac + hmac::digest::KeyInit>(out: &mut [u8], secret: &[u8], seed: &[u8]) {
    let mac = |parts: &[&[u8]]| {
        let mut ctx = <M as Mac>::new_from_slice(secret).unwrap();
        for part in parts {
            ctx.update(part);
        }
        ctx.finalize().into_bytes()
    };

    // A(1)
    let mut current_a = mac(&[seed]);

    let mut offs = 0;
    while offs < out.len() {
        // P_hash[i] = HMAC_hash(secret, A(i) + seed)
        let p_term = mac(&[current_a.as_slice(), seed]);
        let take = (out.len() - offs).min(p_term.len());
        out[offs..offs + take].copy_from_slice(&p_term[..take]);
        offs += take;

        // A(i+1) = HMAC_hash(secret, A(i))
        current_a = mac(&[current_a.as_slice()]);
    }
}

pub fn prf(out: &mut [u8], hash: HashAlgorithm, secret: &[u8], label: &[u8], seed: &[u8]) {
    let mut joined_seed = Vec::with_capacity(label.len() + seed.len());
    joined_seed.extend_from_slice(label);
    joined_seed.extend_from_slice(seed);

    match hash {
        HashAlgorithm::SHA256 => p_hash::<Hmac<Sha256>>(out, secret, &joined_seed),
        HashAlgorithm::SHA384 => p_hash::<Hmac<Sha384>>(out, secret, &joined_seed),
        _ => unreachable!(),
    }
}

/// The connection secrets of one TLS 1.2 session: both randoms and the
/// master secret, plus the suite hash they were derived under.
pub struct SessionSecrets {
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
    hash: HashAlgorithm,
    master_secret: [u8; 48],
}

impl SessionSecrets {
    pub fn new(
        client_random: &[u8; 32],
        server_random: &[u8; 32],
        hash: HashAlgorithm,
        pre_master_secret: &[u8],
    ) -> SessionSecrets {
        let mut randoms = [0u8; 64];
        randoms[..32].copy_from_slice(client_random);
        randoms[32..].copy_from_slice(server_random);

        let mut ret = SessionSecrets {
            client_random: *client_random,
            server_random: *server_random,
            hash,
            master_secret: [0u8; 48],
        };
        prf(
            &mut ret.master_secret,
            hash,
            pre_master_secret,
            b"master secret",
            &randoms,
        );
        ret
    }

    /// Expand the key block the record ciphers are cut from.
    pub fn make_key_block(&self, len: usize) -> Vec<u8> {
        // key expansion uses the randoms swapped around.
        let mut randoms = [0u8; 64];
        randoms[..32].copy_from_slice(&self.server_random);
        randoms[32..].copy_from_slice(&self.client_random);

        let mut out = vec![0u8; len];
        prf(
            &mut out,
            self.hash,
            &self.master_secret,
            b"key expansion",
            &randoms,
        );
        out
    }

    pub fn client_verify_data(&self, handshake_hash: &[u8]) -> [u8; 12] {
        self.verify_data(b"client finished", handshake_hash)
    }

    pub fn server_verify_data(&self, handshake_hash: &[u8]) -> [u8; 12] {
        self.verify_data(b"server finished", handshake_hash)
    }

    fn verify_data(&self, label: &[u8], handshake_hash: &[u8]) -> [u8; 12] {
        let mut out = [0u8; 12];
        prf(&mut out, self.hash, &self.master_secret, label, handshake_hash);
        out
    }
}

impl Drop for SessionSecrets {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sha2::{Digest, Sha256};

    // Expected outputs computed with the Python `hmac`/`hashlib`
    // modules, RFC 5246 section 5.

    #[test]
    fn check_sha256() {
        let secret: Vec<u8> = (0u8..16).collect();
        let seed: Vec<u8> = (16u8..32).collect();
        let expect = include_bytes!("testdata/prf-result.1.bin");
        let mut output = [0u8; 100];

        prf(&mut output, HashAlgorithm::SHA256, &secret, b"test label", &seed);
        assert_eq!(expect.len(), output.len());
        assert_eq!(expect.to_vec(), output.to_vec());
    }

    #[test]
    fn check_sha384() {
        let secret: Vec<u8> = (0u8..16).collect();
        let seed: Vec<u8> = (16u8..32).collect();
        let expect = include_bytes!("testdata/prf-result.2.bin");
        let mut output = [0u8; 148];

        prf(&mut output, HashAlgorithm::SHA384, &secret, b"test label", &seed);
        assert_eq!(expect.len(), output.len());
        assert_eq!(expect.to_vec(), output.to_vec());
    }

    const PRE_MASTER: [u8; 32] = [
        0x4a, 0x5d, 0x9d, 0x5b, 0xa4, 0xce, 0x2d, 0xe1, 0x72, 0x8e, 0x3b, 0xf4, 0x80, 0x35,
        0x0f, 0x25, 0xe0, 0x7e, 0x21, 0xc9, 0x47, 0xd1, 0x9e, 0x33, 0x76, 0xf0, 0x9b, 0x3c,
        0x1e, 0x16, 0x17, 0x42,
    ];

    const MASTER: [u8; 48] = [
        0x3d, 0xcd, 0x0e, 0x1f, 0xa7, 0x17, 0xe4, 0x1f, 0xf5, 0x60, 0x50, 0x9c, 0x61, 0xc4,
        0x03, 0x99, 0x22, 0xfb, 0x8d, 0x2a, 0x75, 0x80, 0x72, 0x8e, 0xf9, 0x91, 0xc0, 0x74,
        0x8f, 0x24, 0x4b, 0x0b, 0x41, 0x25, 0xf4, 0x29, 0xb4, 0xf7, 0x1e, 0xd8, 0xb2, 0x08,
        0x40, 0x93, 0xe4, 0x09, 0x53, 0xae,
    ];

    fn secrets() -> SessionSecrets {
        let mut client_random = [0u8; 32];
        let mut server_random = [0u8; 32];
        for i in 0..32 {
            client_random[i] = i as u8;
            server_random[i] = 32 + i as u8;
        }
        SessionSecrets::new(
            &client_random,
            &server_random,
            HashAlgorithm::SHA256,
            &PRE_MASTER,
        )
    }

    #[test]
    fn derives_master_secret() {
        assert_eq!(secrets().master_secret, MASTER);
    }

    #[test]
    fn derives_key_block() {
        let expect = include_bytes!("testdata/key-block-cbc-sha.bin");
        assert_eq!(secrets().make_key_block(104), expect.to_vec());
    }

    #[test]
    fn derives_finished_verify_data() {
        let transcript = Sha256::digest(b"all the handshake messages");
        assert_eq!(
            secrets().client_verify_data(&transcript),
            [0xa6, 0x2a, 0x13, 0x72, 0x19, 0x68, 0xb7, 0xee, 0x44, 0x3e, 0xb3, 0xc7]
        );
        assert_eq!(
            secrets().server_verify_data(&transcript),
            [0x72, 0x9e, 0xe2, 0x3c, 0x50, 0x6f, 0xa9, 0xaf, 0xc0, 0xd0, 0x3c, 0xf1]
        );
    }
}
