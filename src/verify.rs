use std::io;

use ed25519_dalek::Verifier;
use log::warn;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;

use crate::error::TlsError;
use crate::msgs::enums::{NamedGroup, SignatureScheme};
use crate::pemfile;

/// The server's public key, lifted out of its certificate.
#[derive(Debug, Clone)]
pub enum CertPublicKey {
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    EcdsaP256(Vec<u8>),
    EcdsaP384(Vec<u8>),
    Ed25519(Vec<u8>),
}

// Algorithm identifiers in dotted form, as `Oid::to_id_string`
// renders them.
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_RSA_SHA1: &str = "1.2.840.113549.1.1.5";
const OID_RSA_SHA256: &str = "1.2.840.113549.1.1.11";
const OID_RSA_SHA384: &str = "1.2.840.113549.1.1.12";
const OID_RSA_SHA512: &str = "1.2.840.113549.1.1.13";
const OID_ECDSA_SHA256: &str = "1.2.840.10045.4.3.2";
const OID_ECDSA_SHA384: &str = "1.2.840.10045.4.3.3";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_EC_P256: &str = "1.2.840.10045.3.1.7";
const OID_EC_P384: &str = "1.3.132.0.34";
const OID_ED25519: &str = "1.3.101.112";

/// Verify `sig` over `message` under `key`, using `scheme`.
///
/// The scheme's hash and the certificate key may disagree about curves
/// for ECDSA; all four combinations are accepted, which is why the
/// digest is computed here and handed to the curve as a prehash.
pub fn verify_signed(
    scheme: SignatureScheme,
    key: &CertPublicKey,
    message: &[u8],
    sig: &[u8],
) -> Result<(), TlsError> {
    match scheme {
        SignatureScheme::ECDSA_NISTP256_SHA256 | SignatureScheme::ECDSA_NISTP384_SHA384 => {
            verify_ecdsa(scheme, key, message, sig)
        }
        SignatureScheme::ED25519 => verify_ed25519(key, message, sig),
        SignatureScheme::RSA_PSS_SHA256
        | SignatureScheme::RSA_PSS_SHA384
        | SignatureScheme::RSA_PSS_SHA512 => verify_rsa_pss(scheme, key, message, sig),
        SignatureScheme::RSA_PKCS1_SHA1
        | SignatureScheme::RSA_PKCS1_SHA256
        | SignatureScheme::RSA_PKCS1_SHA384
        | SignatureScheme::RSA_PKCS1_SHA512 => verify_rsa_pkcs1(scheme, key, message, sig),
        _ => Err(TlsError::UnknownSignatureScheme),
    }
}

fn verify_ecdsa(
    scheme: SignatureScheme,
    key: &CertPublicKey,
    message: &[u8],
    sig: &[u8],
) -> Result<(), TlsError> {
    let digest = match scheme {
        SignatureScheme::ECDSA_NISTP256_SHA256 => Sha256::digest(message).to_vec(),
        SignatureScheme::ECDSA_NISTP384_SHA384 => Sha384::digest(message).to_vec(),
        _ => unreachable!(),
    };

    match key {
        CertPublicKey::EcdsaP256(point) => {
            let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| TlsError::InvalidEncoding)?;
            let sig =
                p256::ecdsa::Signature::from_der(sig).map_err(|_| TlsError::InvalidEncoding)?;
            vk.verify_prehash(&digest, &sig)
                .map_err(|_| TlsError::DecryptError)
        }
        CertPublicKey::EcdsaP384(point) => {
            let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| TlsError::InvalidEncoding)?;
            let sig =
                p384::ecdsa::Signature::from_der(sig).map_err(|_| TlsError::InvalidEncoding)?;
            vk.verify_prehash(&digest, &sig)
                .map_err(|_| TlsError::DecryptError)
        }
        _ => Err(TlsError::BadSignatureScheme),
    }
}

fn verify_ed25519(key: &CertPublicKey, message: &[u8], sig: &[u8]) -> Result<(), TlsError> {
    let point = match key {
        CertPublicKey::Ed25519(point) => point,
        _ => return Err(TlsError::BadSignatureScheme),
    };

    let point: &[u8; 32] = point
        .as_slice()
        .try_into()
        .map_err(|_| TlsError::InvalidEncoding)?;
    let vk =
        ed25519_dalek::VerifyingKey::from_bytes(point).map_err(|_| TlsError::InvalidEncoding)?;
    let sig: &[u8; 64] = sig.try_into().map_err(|_| TlsError::InvalidEncoding)?;
    vk.verify(message, &ed25519_dalek::Signature::from_bytes(sig))
        .map_err(|_| TlsError::DecryptError)
}

fn rsa_public_key(key: &CertPublicKey) -> Result<rsa::RsaPublicKey, TlsError> {
    let (modulus, exponent) = match key {
        CertPublicKey::Rsa { modulus, exponent } => (modulus, exponent),
        _ => return Err(TlsError::BadSignatureScheme),
    };

    let mut modulus = modulus.as_slice();
    while modulus.first() == Some(&0) {
        modulus = &modulus[1..];
    }
    match modulus.len() {
        128 | 256 | 384 | 512 => (),
        _ => return Err(TlsError::BadRsaSignatureBitCount),
    }

    rsa::RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(modulus),
        rsa::BigUint::from_bytes_be(exponent),
    )
    .map_err(|_| TlsError::InvalidEncoding)
}

fn verify_rsa_pss(
    scheme: SignatureScheme,
    key: &CertPublicKey,
    message: &[u8],
    sig: &[u8],
) -> Result<(), TlsError> {
    let key = rsa_public_key(key)?;
    let result = match scheme {
        SignatureScheme::RSA_PSS_SHA256 => key.verify(
            rsa::pss::Pss::new::<Sha256>(),
            &Sha256::digest(message),
            sig,
        ),
        SignatureScheme::RSA_PSS_SHA384 => key.verify(
            rsa::pss::Pss::new::<Sha384>(),
            &Sha384::digest(message),
            sig,
        ),
        SignatureScheme::RSA_PSS_SHA512 => key.verify(
            rsa::pss::Pss::new::<Sha512>(),
            &Sha512::digest(message),
            sig,
        ),
        _ => unreachable!(),
    };
    result.map_err(|_| TlsError::DecryptError)
}

fn verify_rsa_pkcs1(
    scheme: SignatureScheme,
    key: &CertPublicKey,
    message: &[u8],
    sig: &[u8],
) -> Result<(), TlsError> {
    let key = rsa_public_key(key)?;
    let result = match scheme {
        SignatureScheme::RSA_PKCS1_SHA1 => key.verify(
            rsa::pkcs1v15::Pkcs1v15Sign::new::<Sha1>(),
            &Sha1::digest(message),
            sig,
        ),
        SignatureScheme::RSA_PKCS1_SHA256 => key.verify(
            rsa::pkcs1v15::Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(message),
            sig,
        ),
        SignatureScheme::RSA_PKCS1_SHA384 => key.verify(
            rsa::pkcs1v15::Pkcs1v15Sign::new::<Sha384>(),
            &Sha384::digest(message),
            sig,
        ),
        SignatureScheme::RSA_PKCS1_SHA512 => key.verify(
            rsa::pkcs1v15::Pkcs1v15Sign::new::<Sha512>(),
            &Sha512::digest(message),
            sig,
        ),
        _ => unreachable!(),
    };
    result.map_err(|_| TlsError::DecryptError)
}

/// The bytes a TLS 1.2 ServerKeyExchange signature covers: both
/// randoms, then the named-curve parameters as they appeared on the
/// wire.
pub fn tls12_kx_verify_bytes(
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    group: NamedGroup,
    server_pub: &[u8],
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(64 + 4 + server_pub.len());
    bytes.extend_from_slice(client_random);
    bytes.extend_from_slice(server_random);
    bytes.push(0x03); // curve_type: named_curve
    bytes.extend_from_slice(&group.get_u16().to_be_bytes());
    bytes.push(server_pub.len() as u8);
    bytes.extend_from_slice(server_pub);
    bytes
}

/// The bytes a TLS 1.3 server CertificateVerify signature covers.
pub fn tls13_verify_bytes(transcript_hash: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(64 + 34 + transcript_hash.len());
    bytes.extend_from_slice(&[0x20; 64]);
    bytes.extend_from_slice(b"TLS 1.3, server CertificateVerify");
    bytes.push(0x00);
    bytes.extend_from_slice(transcript_hash);
    bytes
}

fn parse_cert(der: &[u8]) -> Result<X509Certificate, TlsError> {
    parse_x509_certificate(der)
        .map(|(_, cert)| cert)
        .map_err(|_| TlsError::CertificateMalformed)
}

/// Lift the subject public key out of a certificate.
pub fn cert_public_key(cert: &X509Certificate) -> Result<CertPublicKey, TlsError> {
    let spki = cert.public_key();
    let alg = spki.algorithm.algorithm.to_id_string();

    match alg.as_str() {
        OID_RSA_ENCRYPTION => match spki.parsed() {
            Ok(x509_parser::public_key::PublicKey::RSA(rsa)) => Ok(CertPublicKey::Rsa {
                modulus: rsa.modulus.to_vec(),
                exponent: rsa.exponent.to_vec(),
            }),
            _ => Err(TlsError::CertificateMalformed),
        },
        OID_EC_PUBLIC_KEY => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .ok_or(TlsError::CertificateMalformed)?
                .to_id_string();
            let point = spki.subject_public_key.data.as_ref().to_vec();
            match curve.as_str() {
                OID_EC_P256 => Ok(CertPublicKey::EcdsaP256(point)),
                OID_EC_P384 => Ok(CertPublicKey::EcdsaP384(point)),
                _ => Err(TlsError::CertificateMalformed),
            }
        }
        OID_ED25519 => Ok(CertPublicKey::Ed25519(
            spki.subject_public_key.data.as_ref().to_vec(),
        )),
        _ => Err(TlsError::CertificateMalformed),
    }
}

/// Map a certificate's signature algorithm onto the scheme that checks
/// it; the key's own curve resolves ECDSA, so one scheme per hash is
/// enough.
fn cert_signature_scheme(cert: &X509Certificate) -> Result<SignatureScheme, TlsError> {
    match cert.signature_algorithm.algorithm.to_id_string().as_str() {
        OID_ECDSA_SHA256 => Ok(SignatureScheme::ECDSA_NISTP256_SHA256),
        OID_ECDSA_SHA384 => Ok(SignatureScheme::ECDSA_NISTP384_SHA384),
        OID_RSA_SHA1 => Ok(SignatureScheme::RSA_PKCS1_SHA1),
        OID_RSA_SHA256 => Ok(SignatureScheme::RSA_PKCS1_SHA256),
        OID_RSA_SHA384 => Ok(SignatureScheme::RSA_PKCS1_SHA384),
        OID_RSA_SHA512 => Ok(SignatureScheme::RSA_PKCS1_SHA512),
        OID_ED25519 => Ok(SignatureScheme::ED25519),
        _ => Err(TlsError::UnknownSignatureScheme),
    }
}

/// Check that `cert_der` is signed by `issuer_der`'s key.
///
/// A subject/issuer name mismatch reports `CertificateIssuerMismatch`,
/// which the chain walk treats as "try the next certificate".
pub fn verify_cert_signed_by(cert_der: &[u8], issuer_der: &[u8]) -> Result<(), TlsError> {
    let cert = parse_cert(cert_der)?;
    let issuer = parse_cert(issuer_der)?;

    if issuer.tbs_certificate.subject.as_raw() != cert.tbs_certificate.issuer.as_raw() {
        return Err(TlsError::CertificateIssuerMismatch);
    }

    let scheme = cert_signature_scheme(&cert)?;
    let key = cert_public_key(&issuer)?;
    verify_signed(
        scheme,
        &key,
        cert.tbs_certificate.as_ref(),
        cert.signature_value.data.as_ref(),
    )
    .map_err(|_| TlsError::CertificateSignatureInvalid)
}

fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.');
    let host = host.trim_end_matches('.');

    if let Some(suffix) = pattern.strip_prefix("*.") {
        // A wildcard covers exactly one extra label.
        match host.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest.eq_ignore_ascii_case(suffix),
            None => false,
        }
    } else {
        pattern.eq_ignore_ascii_case(host)
    }
}

/// Does the certificate name this host?  Subject alternative names
/// take precedence; the subject common name is only a fallback.
pub fn cert_matches_hostname(cert: &X509Certificate, host: &str) -> bool {
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        let mut saw_dns = false;
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                saw_dns = true;
                if dns_name_matches(dns, host) {
                    return true;
                }
            }
        }
        if saw_dns {
            return false;
        }
    }

    cert.subject()
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .any(|cn| dns_name_matches(cn, host))
}

/// A container for root certificates able to provide a root-of-trust
/// for connection authentication.
pub struct RootCertStore {
    roots: Vec<Vec<u8>>,
}

impl RootCertStore {
    /// Make a new, empty `RootCertStore`.
    pub fn empty() -> RootCertStore {
        RootCertStore { roots: Vec::new() }
    }

    /// Say how many certificates are in the container.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Add a single DER-encoded certificate to the store.
    pub fn add(&mut self, der: &[u8]) -> Result<(), TlsError> {
        parse_cert(der)?;
        self.roots.push(der.to_vec());
        Ok(())
    }

    /// Parse a PEM file and add all certificates found inside.
    /// Returns the number of certificates added, and the number which
    /// were extracted from the PEM but ultimately unsuitable.
    pub fn add_pem_file(&mut self, rd: &mut dyn io::BufRead) -> Result<(usize, usize), TlsError> {
        let ders = pemfile::certs(rd)?;
        let mut valid_count = 0;
        let mut invalid_count = 0;

        for der in ders {
            match self.add(&der) {
                Ok(_) => valid_count += 1,
                Err(err) => {
                    warn!("certificate parsing failed: {:?}", err);
                    invalid_count += 1
                }
            }
        }

        Ok((valid_count, invalid_count))
    }

    /// Try to anchor `cert_der` directly to one of our roots, checking
    /// validity windows at `now` (seconds since the unix epoch).
    pub fn verify(&self, cert_der: &[u8], now: u64) -> Result<(), TlsError> {
        let cert = parse_cert(cert_der)?;
        let at = ASN1Time::from_timestamp(now as i64).map_err(|_| TlsError::CertificateExpired)?;

        for root_der in &self.roots {
            let root = parse_cert(root_der)?;
            if root.tbs_certificate.subject.as_raw() != cert.tbs_certificate.issuer.as_raw() {
                continue;
            }

            if !cert.validity().is_valid_at(at) || !root.validity().is_valid_at(at) {
                return Err(TlsError::CertificateExpired);
            }

            return verify_cert_signed_by(cert_der, root_der)
                .map_err(|_| TlsError::CertificateSignatureInvalid);
        }

        Err(TlsError::CertificateIssuerNotFound)
    }
}

/// Walk the server's certificate chain in wire order.
///
/// The first certificate must cover `host` and provides the key later
/// signatures are checked against.  Each following certificate must
/// sign the current tail; ones that don't chain are skipped.  With a
/// root store present, every accepted link is probed against it, and
/// failing to anchor anywhere is fatal.
pub fn verify_server_chain(
    chain: &[Vec<u8>],
    host: &str,
    roots: Option<&RootCertStore>,
    now: u64,
) -> Result<CertPublicKey, TlsError> {
    if chain.is_empty() {
        return Err(TlsError::DecodeError);
    }

    let first = parse_cert(&chain[0])?;
    if !cert_matches_hostname(&first, host) {
        return Err(TlsError::HostnameMismatch);
    }
    let key = cert_public_key(&first)?;

    let probe = |der: &[u8]| -> Result<bool, TlsError> {
        match roots {
            Some(store) => match store.verify(der, now) {
                Ok(()) => Ok(true),
                Err(TlsError::CertificateIssuerNotFound) => Ok(false),
                Err(err) => Err(err),
            },
            None => Ok(false),
        }
    };

    let mut trusted = probe(&chain[0])?;

    let mut tail = 0;
    for i in 1..chain.len() {
        if trusted {
            break;
        }

        match verify_cert_signed_by(&chain[tail], &chain[i]) {
            Ok(()) => {
                tail = i;
                trusted = probe(&chain[i])?;
            }
            Err(TlsError::CertificateIssuerMismatch) => {
                warn!("certificate {} does not chain, skipping", i);
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    if roots.is_some() && !trusted {
        return Err(TlsError::CertificateIssuerNotFound);
    }

    Ok(key)
}
