use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::TlsError;
use crate::msgs::enums::NamedGroup;
use crate::rand::{RandomSource, SourceRng};
use crate::verify::CertPublicKey;

/// X25519 public share followed by a Kyber768 ciphertext.
pub const HYBRID_SHARE_LEN: usize = 32 + 1088;

/// Largest server key share we accept (the hybrid one).
pub const MAX_SERVER_SHARE_LEN: usize = HYBRID_SHARE_LEN;

/// Ephemeral key pairs for every group we offer, all derived from one
/// 64-byte seed so a pinned random source produces a reproducible
/// ClientHello.
pub struct KeyPairs {
    x25519: x25519_dalek::StaticSecret,
    p256: p256::SecretKey,
    p384: p384::SecretKey,
    kyber: pqc_kyber::Keypair,
}

impl KeyPairs {
    pub fn generate(seed: &[u8; 64]) -> Result<KeyPairs, TlsError> {
        let mut x_bytes = [0u8; 32];
        x_bytes.copy_from_slice(&seed[..32]);

        Ok(KeyPairs {
            x25519: x25519_dalek::StaticSecret::from(x_bytes),
            p256: p256::SecretKey::from_slice(&seed[..32])
                .map_err(|_| TlsError::IllegalParameter)?,
            p384: p384::SecretKey::from_slice(&seed[16..64])
                .map_err(|_| TlsError::IllegalParameter)?,
            kyber: pqc_kyber::derive(seed).map_err(|_| TlsError::DecryptFailure)?,
        })
    }

    /// Our share for `group`, as it goes on the wire: raw for X25519,
    /// uncompressed SEC1 for the NIST curves, X25519 then Kyber768
    /// encapsulation key for the hybrid.
    pub fn public_key(&self, group: NamedGroup) -> Result<Vec<u8>, TlsError> {
        match group {
            NamedGroup::X25519 => {
                Ok(x25519_dalek::PublicKey::from(&self.x25519).as_bytes().to_vec())
            }
            NamedGroup::secp256r1 => Ok(self
                .p256
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec()),
            NamedGroup::secp384r1 => Ok(self
                .p384
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec()),
            NamedGroup::X25519Kyber768Draft00 => {
                let mut out = Vec::with_capacity(32 + pqc_kyber::KYBER_PUBLICKEYBYTES);
                out.extend_from_slice(x25519_dalek::PublicKey::from(&self.x25519).as_bytes());
                out.extend_from_slice(&self.kyber.public);
                Ok(out)
            }
            _ => Err(TlsError::IllegalParameter),
        }
    }

    /// Run the agreement for `group` against the server's share.
    pub fn shared_secret(&self, group: NamedGroup, peer: &[u8]) -> Result<Vec<u8>, TlsError> {
        match group {
            NamedGroup::X25519 => {
                let peer: [u8; 32] = peer.try_into().map_err(|_| TlsError::IllegalParameter)?;
                let peer = x25519_dalek::PublicKey::from(peer);
                Ok(self.x25519.diffie_hellman(&peer).as_bytes().to_vec())
            }
            NamedGroup::secp256r1 => {
                let peer = p256::PublicKey::from_sec1_bytes(peer)
                    .map_err(|_| TlsError::IllegalParameter)?;
                let shared =
                    p256::ecdh::diffie_hellman(self.p256.to_nonzero_scalar(), peer.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            NamedGroup::secp384r1 => {
                let peer = p384::PublicKey::from_sec1_bytes(peer)
                    .map_err(|_| TlsError::IllegalParameter)?;
                let shared =
                    p384::ecdh::diffie_hellman(self.p384.to_nonzero_scalar(), peer.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            NamedGroup::X25519Kyber768Draft00 => {
                if peer.len() != HYBRID_SHARE_LEN {
                    return Err(TlsError::IllegalParameter);
                }

                let x_peer: [u8; 32] = peer[..32].try_into().unwrap();
                let x_peer = x25519_dalek::PublicKey::from(x_peer);

                let mut out = Vec::with_capacity(64);
                out.extend_from_slice(self.x25519.diffie_hellman(&x_peer).as_bytes());
                let kem = pqc_kyber::decapsulate(&peer[32..], &self.kyber.secret)
                    .map_err(|_| TlsError::DecryptFailure)?;
                out.extend_from_slice(&kem);
                Ok(out)
            }
            _ => Err(TlsError::IllegalParameter),
        }
    }
}

/// The TLS 1.2 key-transport pre-master secret: the offered protocol
/// version followed by 46 random bytes.
pub fn rsa_pre_master(random46: &[u8; 46]) -> [u8; 48] {
    let mut pre_master = [0u8; 48];
    pre_master[0] = 0x03;
    pre_master[1] = 0x03;
    pre_master[2..].copy_from_slice(random46);
    pre_master
}

/// Encrypt the pre-master secret under the certificate's RSA key for
/// the ClientKeyExchange.
pub fn encrypt_rsa_pre_master(
    pre_master: &[u8; 48],
    cert_key: &CertPublicKey,
    random: RandomSource,
) -> Result<Vec<u8>, TlsError> {
    let (modulus, exponent) = match cert_key {
        CertPublicKey::Rsa { modulus, exponent } => (modulus, exponent),
        _ => return Err(TlsError::BadSignatureScheme),
    };

    let key = rsa::RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(modulus),
        rsa::BigUint::from_bytes_be(exponent),
    )
    .map_err(|_| TlsError::InvalidEncoding)?;

    let mut rng = SourceRng(random);
    key.encrypt(&mut rng, rsa::Pkcs1v15Encrypt, pre_master)
        .map_err(|_| TlsError::InvalidEncoding)
}

#[cfg(test)]
mod test {
    use super::*;

    fn pairs(fill: u8) -> KeyPairs {
        let mut seed = [fill; 64];
        for (i, b) in seed.iter_mut().enumerate() {
            *b ^= i as u8;
        }
        KeyPairs::generate(&seed).unwrap()
    }

    #[test]
    fn x25519_reference_vector() {
        // RFC 7748 section 6.1.
        let mut seed = [0u8; 64];
        seed[..32].copy_from_slice(&[
            0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d, 0x3c, 0x16, 0xc1, 0x72, 0x51,
            0xb2, 0x66, 0x45, 0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a, 0xb1, 0x77,
            0xfb, 0xa5, 0x1d, 0xb9, 0x2c, 0x2a,
        ]);
        seed[32..].copy_from_slice(&[0x42; 32]);
        let kp = KeyPairs::generate(&seed).unwrap();

        assert_eq!(
            kp.public_key(NamedGroup::X25519).unwrap(),
            vec![
                0x85, 0x20, 0xf0, 0x09, 0x89, 0x30, 0xa7, 0x54, 0x74, 0x8b, 0x7d, 0xdc, 0xb4,
                0x3e, 0xf7, 0x5a, 0x0d, 0xbf, 0x3a, 0x0d, 0x26, 0x38, 0x1a, 0xf4, 0xeb, 0xa4,
                0xa9, 0x8e, 0xaa, 0x9b, 0x4e, 0x6a
            ]
        );

        let bob_public = [
            0xde, 0x9e, 0xdb, 0x7d, 0x7b, 0x7d, 0xc1, 0xb4, 0xd3, 0x5b, 0x61, 0xc2, 0xec,
            0xe4, 0x35, 0x37, 0x3f, 0x83, 0x43, 0xc8, 0x5b, 0x78, 0x67, 0x4d, 0xad, 0xfc,
            0x7e, 0x14, 0x6f, 0x88, 0x2b, 0x4f,
        ];
        assert_eq!(
            kp.shared_secret(NamedGroup::X25519, &bob_public).unwrap(),
            vec![
                0x4a, 0x5d, 0x9d, 0x5b, 0xa4, 0xce, 0x2d, 0xe1, 0x72, 0x8e, 0x3b, 0xf4, 0x80,
                0x35, 0x0f, 0x25, 0xe0, 0x7e, 0x21, 0xc9, 0x47, 0xd1, 0x9e, 0x33, 0x76, 0xf0,
                0x9b, 0x3c, 0x1e, 0x16, 0x17, 0x42
            ]
        );
    }

    #[test]
    fn nist_agreement_is_symmetric() {
        let a = pairs(0x11);
        let b = pairs(0x77);

        for group in [NamedGroup::secp256r1, NamedGroup::secp384r1] {
            let a_pub = a.public_key(group).unwrap();
            let b_pub = b.public_key(group).unwrap();
            assert_eq!(a_pub[0], 0x04);
            let left = a.shared_secret(group, &b_pub).unwrap();
            let right = b.shared_secret(group, &a_pub).unwrap();
            assert_eq!(left, right);
            assert_eq!(left.len(), if group == NamedGroup::secp256r1 { 32 } else { 48 });
        }
    }

    #[test]
    fn deterministic_from_seed() {
        let a = pairs(0x3c);
        let b = pairs(0x3c);
        for group in [
            NamedGroup::X25519,
            NamedGroup::secp256r1,
            NamedGroup::secp384r1,
            NamedGroup::X25519Kyber768Draft00,
        ] {
            assert_eq!(a.public_key(group).unwrap(), b.public_key(group).unwrap());
        }
    }

    #[test]
    fn hybrid_share_layout_and_decap() {
        let kp = pairs(0x5a);
        let share = kp.public_key(NamedGroup::X25519Kyber768Draft00).unwrap();
        assert_eq!(share.len(), 32 + pqc_kyber::KYBER_PUBLICKEYBYTES);

        // Play the server: classical share plus an encapsulation
        // against our Kyber key.
        let server_seed = {
            let mut s = [0x99u8; 64];
            for (i, b) in s.iter_mut().enumerate() {
                *b ^= i as u8;
            }
            s
        };
        let server = KeyPairs::generate(&server_seed).unwrap();
        let mut rng = rand::rngs::OsRng;
        let (ct, kem_shared) =
            pqc_kyber::encapsulate(&share[32..], &mut rng).unwrap();

        let mut server_share = server.public_key(NamedGroup::X25519).unwrap();
        server_share.extend_from_slice(&ct);
        assert_eq!(server_share.len(), HYBRID_SHARE_LEN);

        let shared = kp
            .shared_secret(NamedGroup::X25519Kyber768Draft00, &server_share)
            .unwrap();
        assert_eq!(shared.len(), 64);
        assert_eq!(&shared[32..], &kem_shared);
        assert_eq!(
            shared[..32].to_vec(),
            kp.shared_secret(NamedGroup::X25519, &server_share[..32]).unwrap()
        );
    }

    #[test]
    fn wrong_share_lengths_rejected() {
        let kp = pairs(0x21);
        assert!(matches!(
            kp.shared_secret(NamedGroup::X25519, &[0u8; 31]),
            Err(TlsError::IllegalParameter)
        ));
        assert!(matches!(
            kp.shared_secret(NamedGroup::secp256r1, &[0u8; 64]),
            Err(TlsError::IllegalParameter)
        ));
        assert!(matches!(
            kp.shared_secret(NamedGroup::X25519Kyber768Draft00, &[0u8; 1119]),
            Err(TlsError::IllegalParameter)
        ));
    }

    #[test]
    fn pre_master_layout() {
        let pm = rsa_pre_master(&[0xabu8; 46]);
        assert_eq!(&pm[..2], &[0x03, 0x03]);
        assert_eq!(&pm[2..], &[0xabu8; 46][..]);
    }
}
