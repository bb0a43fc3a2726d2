use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::TlsError;

fn extract(
    rd: &mut dyn io::BufRead,
    start_mark: &str,
    end_mark: &str,
) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut ders = Vec::new();
    let mut b64buf = String::new();
    let mut take_base64 = false;

    loop {
        let mut line = String::new();
        let len = rd.read_line(&mut line)?;

        if len == 0 {
            return Ok(ders);
        }

        if line.starts_with(start_mark) {
            take_base64 = true;
            continue;
        }

        if line.starts_with(end_mark) {
            take_base64 = false;
            let der = STANDARD
                .decode(&b64buf)
                .map_err(|_| TlsError::DecodeError)?;
            ders.push(der);
            b64buf.clear();
            continue;
        }

        if take_base64 {
            b64buf.push_str(line.trim());
        }
    }
}

/// Extract all the certificates from `rd`, and return a vec of
/// bytevecs containing the der-format contents.
pub fn certs(rd: &mut dyn io::BufRead) -> Result<Vec<Vec<u8>>, TlsError> {
    extract(
        rd,
        "-----BEGIN CERTIFICATE-----",
        "-----END CERTIFICATE-----",
    )
}
