/// The single place where we generate random material for our own use.
use rand::rngs::OsRng;
use rand::RngCore;

/// Source of cryptographically strong bytes.  The handshake draws all
/// of its randomness through the one configured source, so tests can
/// pin every random input by swapping the function.
pub type RandomSource = fn(&mut [u8]);

/// Fill the whole slice with random material from the operating system.
pub fn fill_random(bytes: &mut [u8]) {
    OsRng.fill_bytes(bytes);
}

/// Adapts a `RandomSource` to the `rand_core` traits, for primitives
/// that insist on drawing their own randomness (RSA encryption padding).
pub(crate) struct SourceRng(pub RandomSource);

impl rand_core::RngCore for SourceRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        (self.0)(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        (self.0)(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        (self.0)(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        (self.0)(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for SourceRng {}
