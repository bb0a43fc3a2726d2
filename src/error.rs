use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::msgs::enums::AlertDescription;

/// tlsmith reports protocol errors using this type.
///
/// Apart from `CertificateIssuerMismatch`, which chain processing
/// swallows while probing for the next usable link, every variant is
/// fatal: the handshake or session that produced it is unusable and the
/// caller should close the transport.
#[derive(Debug)]
pub enum TlsError {
    /// A record or ServerHello claimed a protocol version we did not
    /// negotiate.
    BadVersion,

    /// We received a message that isn't valid right now.
    UnexpectedMessage,

    /// The peer sent a well-formed message with contents we reject.
    IllegalParameter,

    /// A handshake message crossed a record boundary where we require
    /// it to be contained in one record.
    UnsupportedFragmentedHandshakeMessage,

    /// A record declared a payload larger than the protocol allows.
    RecordOverflow,

    /// The peer sent us a syntactically incorrect message.
    DecodeError,

    /// The server asked for a new ClientHello; we don't do that.
    ServerHelloRetryRequest,

    /// Record authentication failed.  This is invariably fatal.
    BadRecordMac,

    /// A decrypted message failed verification (a Finished MAC or a
    /// handshake signature).
    DecryptError,

    /// A key-encapsulation operation failed.
    DecryptFailure,

    /// The signature scheme doesn't fit the certificate's key.
    BadSignatureScheme,

    /// The peer chose a signature scheme we never offered.
    UnknownSignatureScheme,

    /// The RSA modulus is not one of the supported sizes.
    BadRsaSignatureBitCount,

    /// A signature or public key was not validly encoded.
    InvalidEncoding,

    /// No configured trust anchor signs the presented chain.
    CertificateIssuerNotFound,

    /// A candidate issuer's subject doesn't name this certificate's
    /// issuer.  Recoverable inside chain processing only.
    CertificateIssuerMismatch,

    /// A certificate's signature doesn't verify under its issuer's key.
    CertificateSignatureInvalid,

    /// A certificate is outside its validity window.
    CertificateExpired,

    /// A certificate could not be parsed.
    CertificateMalformed,

    /// The first certificate doesn't cover the configured host name.
    HostnameMismatch,

    /// An output buffer was too small for what we needed to emit.
    BufferOverflow,

    /// The transport ended before a complete record arrived.
    EndOfStream,

    /// We received a fatal alert.  This means the peer is unhappy.
    AlertReceived(AlertDescription),

    /// The underlying transport failed.
    Io(io::Error),
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TlsError::AlertReceived(ref desc) => write!(f, "received alert: {:?}", desc),
            TlsError::Io(ref err) => write!(f, "transport error: {}", err),
            ref other => write!(f, "{:?}", other),
        }
    }
}

impl StdError for TlsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            TlsError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TlsError {
    fn from(err: io::Error) -> TlsError {
        TlsError::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::TlsError;
    use crate::msgs::enums::AlertDescription;

    #[test]
    fn display_smoke() {
        assert_eq!(format!("{}", TlsError::BadRecordMac), "BadRecordMac");
        assert_eq!(
            format!("{}", TlsError::AlertReceived(AlertDescription::HandshakeFailure)),
            "received alert: HandshakeFailure"
        );
    }
}
