//! # tlsmith
//!
//! A client-side TLS library that speaks TLS 1.2 and TLS 1.3 over any
//! blocking byte stream, with no I/O of its own beyond that stream.
//!
//! ## Currently implemented
//!
//! * TLS 1.2 and TLS 1.3, negotiated from one ClientHello.
//! * ECDHE over X25519, secp256r1 and secp384r1, the
//!   X25519+Kyber768 hybrid, and legacy RSA key transport.
//! * AES-GCM, ChaCha20-Poly1305 and CBC-HMAC record protection.
//! * Server authentication against caller-supplied trust anchors,
//!   with hostname verification.
//! * Post-handshake alerts, session-ticket skipping and TLS 1.3 key
//!   updates.
//!
//! ## Possible future features
//!
//! * Session resumption and 0-RTT.
//! * Client certificate authentication.
//! * HelloRetryRequest.
//!
//! ## Example
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! let mut roots = tlsmith::RootCertStore::empty();
//! # let pem_bytes: &[u8] = &[];
//! roots.add_pem_file(&mut std::io::BufReader::new(pem_bytes)).unwrap();
//!
//! let config = tlsmith::ClientConfig::new("example.com", &roots);
//! let mut sock = TcpStream::connect("example.com:443").unwrap();
//! let mut sess = tlsmith::ClientSession::handshake(config, &mut sock).unwrap();
//!
//! sess.write(&mut sock, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! while let Some(plaintext) = sess.read(&mut sock).unwrap() {
//!     print!("{}", String::from_utf8_lossy(plaintext));
//! }
//! ```

#![forbid(unsafe_code)]

#[macro_use]
mod msgs;
mod cipher;
mod client;
mod client_hs;
mod error;
mod hash_hs;
mod key_schedule;
mod kx;
mod pemfile;
mod prf;
mod rand;
mod stream;
pub mod suites;
mod verify;

pub use crate::client::{ClientConfig, ClientSession, NegotiatedStats};
pub use crate::error::TlsError;
pub use crate::msgs::deframer::{MAX_CIPHERTEXT_LEN, MAX_FRAGMENT_LEN};
pub use crate::msgs::enums::{
    AlertDescription, CipherSuite, ContentType, NamedGroup, ProtocolVersion, SignatureScheme,
};
pub use crate::rand::{fill_random, RandomSource};
pub use crate::stream::Stream;
pub use crate::suites::{SupportedCipherSuite, ALL_CIPHERSUITES};
pub use crate::verify::RootCertStore;

/// Items for use in testing and debugging tlsmith; not covered by
/// semver and not for general use.
pub mod internal {
    /// Low-level message encoding and framing.
    pub mod msgs {
        pub mod codec {
            pub use crate::msgs::codec::*;
        }
        pub mod deframer {
            pub use crate::msgs::deframer::*;
        }
        pub mod enums {
            pub use crate::msgs::enums::*;
        }
    }
    pub mod cipher {
        pub use crate::cipher::*;
    }
    pub mod hash_hs {
        pub use crate::hash_hs::*;
    }
    pub mod key_schedule {
        pub use crate::key_schedule::*;
    }
    pub mod kx {
        pub use crate::kx::*;
    }
    pub mod prf {
        pub use crate::prf::*;
    }
    pub mod verify {
        pub use crate::verify::*;
    }
}
