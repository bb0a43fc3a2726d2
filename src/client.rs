use std::io;
use std::ops::Range;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::cipher::MessageCipher;
use crate::client_hs;
use crate::error::TlsError;
use crate::key_schedule::derive_next_secret;
use crate::msgs::codec::{read_u24, read_u8, Codec, Reader};
use crate::msgs::deframer::{RecordReader, MAX_FRAGMENT_LEN, MAX_WIRE_SIZE};
use crate::msgs::enums::{
    AlertDescription, AlertLevel, CipherSuite, ContentType, HandshakeType, KeyUpdateRequest,
    NamedGroup, ProtocolVersion, SignatureScheme,
};
use crate::rand::{fill_random, RandomSource};
use crate::suites::{SupportedCipherSuite, ALL_CIPHERSUITES};
use crate::verify::RootCertStore;

/// What the handshake ended up agreeing on.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedStats {
    pub version: ProtocolVersion,
    pub cipher_suite: CipherSuite,
    /// `Unknown(0)` when RSA key transport was used.
    pub named_group: NamedGroup,
    /// `Unknown(0)` when no signature was consumed.
    pub signature_scheme: SignatureScheme,
}

impl Default for NegotiatedStats {
    fn default() -> NegotiatedStats {
        NegotiatedStats {
            version: ProtocolVersion::TLSv1_2,
            cipher_suite: CipherSuite::Unknown(0),
            named_group: NamedGroup::Unknown(0),
            signature_scheme: SignatureScheme::Unknown(0),
        }
    }
}

/// Configuration for one client handshake.
pub struct ClientConfig<'a> {
    /// List of ciphersuites, in preference order.  Must be non-empty.
    pub cipher_suites: &'a [&'static SupportedCipherSuite],

    /// When set, the post-quantum hybrid group is not offered.
    pub disable_hybrid_kex: bool,

    /// Collector for the negotiated parameters, filled in on success.
    pub stats: Option<&'a mut NegotiatedStats>,

    /// Trust anchors for chain validation.  Without them the chain is
    /// still parsed, hostname-checked and internally verified, but no
    /// trust is established; that mode is for callers who verify by
    /// other means.
    pub root_store: Option<&'a RootCertStore>,

    /// Server name, for SNI and hostname verification.
    pub host: &'a str,

    /// Source of all handshake randomness.
    pub random: RandomSource,

    /// Seconds since the unix epoch for certificate validity checks.
    /// `None` means the system clock.
    pub now_unix: Option<u64>,
}

impl<'a> ClientConfig<'a> {
    /// A configuration trusting `root_store`, with the default suite
    /// list and the operating system's randomness.
    pub fn new(host: &'a str, root_store: &'a RootCertStore) -> ClientConfig<'a> {
        ClientConfig {
            cipher_suites: &ALL_CIPHERSUITES,
            disable_hybrid_kex: false,
            stats: None,
            root_store: Some(root_store),
            host,
            random: fill_random,
            now_unix: None,
        }
    }

    /// Like `new`, but without any trust anchors.
    pub fn new_unverified(host: &'a str) -> ClientConfig<'a> {
        ClientConfig {
            cipher_suites: &ALL_CIPHERSUITES,
            disable_hybrid_kex: false,
            stats: None,
            root_store: None,
            host,
            random: fill_random,
            now_unix: None,
        }
    }

    pub(crate) fn now(&self) -> u64 {
        match self.now_unix {
            Some(now) => now,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// TLS 1.3 application traffic secrets, retained so key updates can
/// rotate either direction.
pub(crate) struct Tls13Traffic {
    pub(crate) client_secret: Vec<u8>,
    pub(crate) server_secret: Vec<u8>,
}

/// An established client session.
///
/// All record I/O runs through two fixed buffers owned by the session;
/// incoming ciphertext is decrypted in place, and the slice `read`
/// returns stays valid until the next read call.
pub struct ClientSession {
    cipher: MessageCipher,
    suite: &'static SupportedCipherSuite,
    version: ProtocolVersion,
    negotiated: NegotiatedStats,
    client_seq: u64,
    server_seq: u64,
    deframer: RecordReader,
    write_buf: [u8; MAX_WIRE_SIZE],
    traffic: Option<Tls13Traffic>,
    pending: Range<usize>,
    peer_closed: bool,
    sent_close: bool,
}

impl ClientSession {
    /// Run a client handshake over `sock` with `config`.
    pub fn handshake<T: io::Read + io::Write>(
        config: ClientConfig,
        sock: &mut T,
    ) -> Result<ClientSession, TlsError> {
        client_hs::perform(config, sock)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_handshake(
        cipher: MessageCipher,
        suite: &'static SupportedCipherSuite,
        version: ProtocolVersion,
        deframer: RecordReader,
        client_seq: u64,
        server_seq: u64,
        traffic: Option<Tls13Traffic>,
        negotiated: NegotiatedStats,
    ) -> ClientSession {
        ClientSession {
            cipher,
            suite,
            version,
            negotiated,
            client_seq,
            server_seq,
            deframer,
            write_buf: [0u8; MAX_WIRE_SIZE],
            traffic,
            pending: 0..0,
            peer_closed: false,
            sent_close: false,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.suite.suite
    }

    pub fn negotiated(&self) -> &NegotiatedStats {
        &self.negotiated
    }

    /// Send `data`, fragmented into as many records as needed.
    pub fn write<T: io::Write>(&mut self, sock: &mut T, data: &[u8]) -> Result<(), TlsError> {
        if self.sent_close {
            return Err(TlsError::UnexpectedMessage);
        }

        for chunk in data.chunks(MAX_FRAGMENT_LEN) {
            let n = self.cipher.encrypt(
                &mut self.write_buf,
                self.client_seq,
                ContentType::ApplicationData,
                chunk,
            )?;
            self.client_seq += 1;
            sock.write_all(&self.write_buf[..n])?;
        }
        Ok(())
    }

    /// The next chunk of application data, or `None` once the peer has
    /// closed.  The returned slice lives in the session's read buffer
    /// and is valid until the next read.
    pub fn read<'a, T: io::Read + io::Write>(
        &'a mut self,
        sock: &mut T,
    ) -> Result<Option<&'a [u8]>, TlsError> {
        if !self.pending.is_empty() {
            let range = self.pending.clone();
            self.pending = 0..0;
            return Ok(Some(&self.deframer.buf()[range]));
        }

        match self.next_plaintext(sock)? {
            Some(range) => Ok(Some(&self.deframer.buf()[range])),
            None => Ok(None),
        }
    }

    /// Copying variant of `read`, for io-style callers.  Returns 0 at
    /// end of stream.
    pub fn read_into<T: io::Read + io::Write>(
        &mut self,
        sock: &mut T,
        out: &mut [u8],
    ) -> Result<usize, TlsError> {
        if self.pending.is_empty() {
            match self.next_plaintext(sock)? {
                Some(range) => self.pending = range,
                None => return Ok(0),
            }
        }

        let take = out.len().min(self.pending.len());
        out[..take].copy_from_slice(
            &self.deframer.buf()[self.pending.start..self.pending.start + take],
        );
        self.pending.start += take;
        Ok(take)
    }

    /// Tell the peer we're done writing.
    pub fn send_close_notify<T: io::Write>(&mut self, sock: &mut T) -> Result<(), TlsError> {
        if self.sent_close {
            return Ok(());
        }

        let alert = [
            AlertLevel::Warning.get_u8(),
            AlertDescription::CloseNotify.get_u8(),
        ];
        let n = self.cipher.encrypt(
            &mut self.write_buf,
            self.client_seq,
            ContentType::Alert,
            &alert,
        )?;
        self.client_seq += 1;
        sock.write_all(&self.write_buf[..n])?;
        self.sent_close = true;
        Ok(())
    }

    /// Pump records until application data shows up, handling the
    /// post-handshake control traffic along the way.
    fn next_plaintext<T: io::Read + io::Write>(
        &mut self,
        sock: &mut T,
    ) -> Result<Option<Range<usize>>, TlsError> {
        if self.peer_closed {
            return Ok(None);
        }

        loop {
            let meta = match self.deframer.next_record(sock)? {
                Some(meta) => meta,
                None => return Ok(None),
            };
            if meta.version != ProtocolVersion::TLSv1_2 {
                return Err(TlsError::BadVersion);
            }

            let range = meta.payload.clone();
            if let ContentType::ChangeCipherSpec | ContentType::Unknown(_) = meta.typ {
                return Err(TlsError::UnexpectedMessage);
            }

            let payload = &mut self.deframer.buf_mut()[range.clone()];
            let (typ, inner) = self.cipher.decrypt(payload, meta.typ, self.server_seq)?;
            self.server_seq += 1;

            let abs = range.start + inner.start..range.start + inner.end;
            match typ {
                ContentType::ApplicationData => {
                    if abs.is_empty() {
                        continue;
                    }
                    return Ok(Some(abs));
                }
                ContentType::Alert => {
                    let payload = &self.deframer.buf()[abs];
                    let mut r = Reader::init(payload);
                    let level = AlertLevel::read(&mut r).ok_or(TlsError::DecodeError)?;
                    let desc = AlertDescription::read(&mut r).ok_or(TlsError::DecodeError)?;
                    if desc == AlertDescription::CloseNotify {
                        debug!("peer sent close_notify");
                        self.peer_closed = true;
                        return Ok(None);
                    }
                    debug!("peer sent {:?} alert: {:?}", level, desc);
                    return Err(TlsError::AlertReceived(desc));
                }
                ContentType::Handshake => {
                    self.handle_post_handshake(sock, abs)?;
                }
                ContentType::ChangeCipherSpec | ContentType::Unknown(_) => {
                    return Err(TlsError::UnexpectedMessage)
                }
            }
        }
    }

    /// Post-handshake handshake messages: tickets are ignored, key
    /// updates are honored, anything else is an error.
    fn handle_post_handshake<T: io::Write>(
        &mut self,
        sock: &mut T,
        range: Range<usize>,
    ) -> Result<(), TlsError> {
        let mut offs = range.start;
        while offs < range.end {
            let (typ, body_len, request) = {
                let buf = &self.deframer.buf()[offs..range.end];
                let mut r = Reader::init(buf);
                let typ = read_u8(&mut r).ok_or(TlsError::DecodeError)?;
                let len = read_u24(&mut r).ok_or(TlsError::DecodeError)? as usize;
                let body = r.take(len).ok_or(TlsError::DecodeError)?;
                (typ, len, body.first().copied())
            };

            match (self.version, typ) {
                (ProtocolVersion::TLSv1_3, t) if t == HandshakeType::NewSessionTicket.get_u8() => {
                    debug!("ignoring NewSessionTicket");
                }
                (ProtocolVersion::TLSv1_3, t) if t == HandshakeType::KeyUpdate.get_u8() => {
                    if body_len != 1 {
                        return Err(TlsError::DecodeError);
                    }
                    self.handle_key_update(sock, request.unwrap())?;
                }
                _ => return Err(TlsError::UnexpectedMessage),
            }

            offs += 4 + body_len;
        }
        Ok(())
    }

    fn handle_key_update<T: io::Write>(&mut self, sock: &mut T, request: u8) -> Result<(), TlsError> {
        let requested = match request {
            r if r == KeyUpdateRequest::UpdateNotRequested.get_u8() => false,
            r if r == KeyUpdateRequest::UpdateRequested.get_u8() => true,
            _ => return Err(TlsError::IllegalParameter),
        };

        let traffic = self.traffic.as_mut().ok_or(TlsError::UnexpectedMessage)?;
        debug!("rotating read keys after KeyUpdate");

        traffic.server_secret = derive_next_secret(self.suite.hash, &traffic.server_secret);
        let secret = traffic.server_secret.clone();
        self.cipher.rekey_read(self.suite, &secret);
        self.server_seq = 0;

        if requested {
            // Answer under the current write keys, then rotate ours.
            let msg = [
                HandshakeType::KeyUpdate.get_u8(),
                0x00,
                0x00,
                0x01,
                KeyUpdateRequest::UpdateNotRequested.get_u8(),
            ];
            let n = self.cipher.encrypt(
                &mut self.write_buf,
                self.client_seq,
                ContentType::Handshake,
                &msg,
            )?;
            self.client_seq += 1;
            sock.write_all(&self.write_buf[..n])?;

            let traffic = self.traffic.as_mut().unwrap();
            traffic.client_secret = derive_next_secret(self.suite.hash, &traffic.client_secret);
            let secret = traffic.client_secret.clone();
            self.cipher.rekey_write(self.suite, &secret);
            self.client_seq = 0;
        }

        Ok(())
    }
}
