use crate::msgs::enums::{CipherSuite, HashAlgorithm, ProtocolVersion};

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeyExchangeAlgorithm {
    /// Ephemeral elliptic-curve (or hybrid) agreement, signed by the
    /// server's certificate key.
    ECDHE,
    /// Legacy key transport: the pre-master secret travels encrypted
    /// under the certificate's RSA key.
    RSA,
}

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BulkAlgorithm {
    AES_128_GCM,
    AES_256_GCM,
    CHACHA20_POLY1305,
    AES_128_CBC,
    AES_256_CBC,
}

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MacAlgorithm {
    /// AEAD suites carry no separate MAC.
    NULL,
    HMAC_SHA1,
    HMAC_SHA384,
}

/// A cipher suite supported by tlsmith.
#[derive(Debug)]
pub struct SupportedCipherSuite {
    /// The TLS enumeration naming this cipher suite.
    pub suite: CipherSuite,

    /// Which protocol version uses this suite.
    pub version: ProtocolVersion,

    pub kx: KeyExchangeAlgorithm,
    pub bulk: BulkAlgorithm,

    /// Hash driving the transcript, the PRF and the HKDF schedule.
    pub hash: HashAlgorithm,

    pub mac: MacAlgorithm,
    pub mac_key_len: usize,
    pub enc_key_len: usize,
    pub fixed_iv_len: usize,

    /// Bytes of per-record nonce carried on the wire (GCM in TLS 1.2),
    /// or of a fresh explicit IV (CBC).
    pub explicit_nonce_len: usize,
}

impl PartialEq for SupportedCipherSuite {
    fn eq(&self, other: &SupportedCipherSuite) -> bool {
        self.suite == other.suite
    }
}

impl SupportedCipherSuite {
    pub fn tls13(&self) -> bool {
        self.version == ProtocolVersion::TLSv1_3
    }

    pub fn hash_len(&self) -> usize {
        match self.hash {
            HashAlgorithm::SHA256 => 32,
            HashAlgorithm::SHA384 => 48,
            _ => unreachable!(),
        }
    }

    /// TLS 1.2 key block length: MACs, keys and IVs for both directions.
    pub fn key_block_len(&self) -> usize {
        (self.mac_key_len + self.enc_key_len + self.fixed_iv_len) * 2
    }
}

pub static TLS13_AES_128_GCM_SHA256: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
    version: ProtocolVersion::TLSv1_3,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_128_GCM,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 16,
    fixed_iv_len: 12,
    explicit_nonce_len: 0,
};

pub static TLS13_AES_256_GCM_SHA384: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS13_AES_256_GCM_SHA384,
    version: ProtocolVersion::TLSv1_3,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_256_GCM,
    hash: HashAlgorithm::SHA384,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 32,
    fixed_iv_len: 12,
    explicit_nonce_len: 0,
};

pub static TLS13_CHACHA20_POLY1305_SHA256: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    version: ProtocolVersion::TLSv1_3,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::CHACHA20_POLY1305,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 32,
    fixed_iv_len: 12,
    explicit_nonce_len: 0,
};

pub static TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_128_GCM,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 16,
    fixed_iv_len: 4,
    explicit_nonce_len: 8,
};

pub static TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_256_GCM,
    hash: HashAlgorithm::SHA384,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 32,
    fixed_iv_len: 4,
    explicit_nonce_len: 8,
};

pub static TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_128_GCM,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 16,
    fixed_iv_len: 4,
    explicit_nonce_len: 8,
};

pub static TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_256_GCM,
    hash: HashAlgorithm::SHA384,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 32,
    fixed_iv_len: 4,
    explicit_nonce_len: 8,
};

pub static TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256: SupportedCipherSuite =
    SupportedCipherSuite {
        suite: CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        version: ProtocolVersion::TLSv1_2,
        kx: KeyExchangeAlgorithm::ECDHE,
        bulk: BulkAlgorithm::CHACHA20_POLY1305,
        hash: HashAlgorithm::SHA256,
        mac: MacAlgorithm::NULL,
        mac_key_len: 0,
        enc_key_len: 32,
        fixed_iv_len: 12,
        explicit_nonce_len: 0,
    };

pub static TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256: SupportedCipherSuite =
    SupportedCipherSuite {
        suite: CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        version: ProtocolVersion::TLSv1_2,
        kx: KeyExchangeAlgorithm::ECDHE,
        bulk: BulkAlgorithm::CHACHA20_POLY1305,
        hash: HashAlgorithm::SHA256,
        mac: MacAlgorithm::NULL,
        mac_key_len: 0,
        enc_key_len: 32,
        fixed_iv_len: 12,
        explicit_nonce_len: 0,
    };

pub static TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_128_CBC,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::HMAC_SHA1,
    mac_key_len: 20,
    enc_key_len: 16,
    fixed_iv_len: 16,
    explicit_nonce_len: 16,
};

pub static TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_128_CBC,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::HMAC_SHA1,
    mac_key_len: 20,
    enc_key_len: 16,
    fixed_iv_len: 16,
    explicit_nonce_len: 16,
};

pub static TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_256_CBC,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::HMAC_SHA1,
    mac_key_len: 20,
    enc_key_len: 32,
    fixed_iv_len: 16,
    explicit_nonce_len: 16,
};

pub static TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::ECDHE,
    bulk: BulkAlgorithm::AES_256_CBC,
    hash: HashAlgorithm::SHA384,
    mac: MacAlgorithm::HMAC_SHA384,
    mac_key_len: 48,
    enc_key_len: 32,
    fixed_iv_len: 16,
    explicit_nonce_len: 16,
};

pub static TLS_RSA_WITH_AES_128_GCM_SHA256: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::RSA,
    bulk: BulkAlgorithm::AES_128_GCM,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::NULL,
    mac_key_len: 0,
    enc_key_len: 16,
    fixed_iv_len: 4,
    explicit_nonce_len: 8,
};

pub static TLS_RSA_WITH_AES_128_CBC_SHA: SupportedCipherSuite = SupportedCipherSuite {
    suite: CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    version: ProtocolVersion::TLSv1_2,
    kx: KeyExchangeAlgorithm::RSA,
    bulk: BulkAlgorithm::AES_128_CBC,
    hash: HashAlgorithm::SHA256,
    mac: MacAlgorithm::HMAC_SHA1,
    mac_key_len: 20,
    enc_key_len: 16,
    fixed_iv_len: 16,
    explicit_nonce_len: 16,
};

/// All the cipher suites supported by tlsmith, in default preference
/// order.
pub static ALL_CIPHERSUITES: [&SupportedCipherSuite; 15] = [
    &TLS13_AES_256_GCM_SHA384,
    &TLS13_AES_128_GCM_SHA256,
    &TLS13_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384,
    &TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    &TLS_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_RSA_WITH_AES_128_CBC_SHA,
];

/// Look up the parameters for a suite the server selected.
pub fn find_suite(suite: CipherSuite) -> Option<&'static SupportedCipherSuite> {
    ALL_CIPHERSUITES.iter().find(|scs| scs.suite == suite).copied()
}
