use sha2::{Digest, Sha256, Sha384};

use crate::msgs::enums::HashAlgorithm;

/// This deals with keeping a running hash of the handshake payloads.
///
/// The server's suite choice decides between SHA-256 and SHA-384, but
/// the ClientHello has to be absorbed before that choice is known, so
/// both run in parallel until `pick` collapses to one.
pub struct HandshakeHash {
    sha256: Option<Sha256>,
    sha384: Option<Sha384>,
}

impl HandshakeHash {
    pub fn new() -> HandshakeHash {
        HandshakeHash {
            sha256: Some(Sha256::new()),
            sha384: Some(Sha384::new()),
        }
    }

    /// Absorb handshake message bytes, excluding the record header.
    pub fn update(&mut self, bytes: &[u8]) -> &mut HandshakeHash {
        if let Some(ctx) = &mut self.sha256 {
            ctx.update(bytes);
        }
        if let Some(ctx) = &mut self.sha384 {
            ctx.update(bytes);
        }
        self
    }

    /// Discard the hash the chosen suite doesn't use.
    pub fn pick(&mut self, hash: HashAlgorithm) {
        match hash {
            HashAlgorithm::SHA256 => self.sha384 = None,
            HashAlgorithm::SHA384 => self.sha256 = None,
            _ => unreachable!(),
        }
    }

    /// The transcript hash over everything absorbed so far.
    pub fn current(&self) -> Vec<u8> {
        match (&self.sha256, &self.sha384) {
            (Some(ctx), None) => ctx.clone().finalize().to_vec(),
            (None, Some(ctx)) => ctx.clone().finalize().to_vec(),
            _ => panic!("transcript hash still ambiguous"),
        }
    }

    /// Like `current`, before the suite is known.
    pub fn current_for(&self, hash: HashAlgorithm) -> Vec<u8> {
        match hash {
            HashAlgorithm::SHA256 => self.sha256.as_ref().unwrap().clone().finalize().to_vec(),
            HashAlgorithm::SHA384 => self.sha384.as_ref().unwrap().clone().finalize().to_vec(),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sha2::{Digest, Sha256, Sha384};

    #[test]
    fn tracks_both_until_picked() {
        let mut hh = HandshakeHash::new();
        hh.update(b"client hello bytes");
        hh.update(b"server hello bytes");

        let mut whole = Sha256::new();
        whole.update(b"client hello bytesserver hello bytes");
        assert_eq!(
            hh.current_for(HashAlgorithm::SHA256),
            whole.finalize().to_vec()
        );

        let mut whole = Sha384::new();
        whole.update(b"client hello bytesserver hello bytes");
        assert_eq!(
            hh.current_for(HashAlgorithm::SHA384),
            whole.finalize().to_vec()
        );

        hh.pick(HashAlgorithm::SHA384);
        hh.update(b"more");
        assert_eq!(hh.current().len(), 48);
    }

    #[test]
    fn updates_are_order_sensitive() {
        let mut a = HandshakeHash::new();
        a.update(b"one").update(b"two");
        let mut b = HandshakeHash::new();
        b.update(b"two").update(b"one");
        assert_ne!(
            a.current_for(HashAlgorithm::SHA256),
            b.current_for(HashAlgorithm::SHA256)
        );
    }
}
