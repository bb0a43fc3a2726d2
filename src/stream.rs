use std::io::{Read, Result, Write};

use crate::client::ClientSession;
use crate::error::TlsError;

/// This type implements `io::Read` and `io::Write`, encapsulating
/// a session object and an underlying transport.
pub struct Stream<'a, T: 'a + Read + Write> {
    pub sess: &'a mut ClientSession,
    pub sock: &'a mut T,
}

impl<'a, T> Stream<'a, T>
where
    T: 'a + Read + Write,
{
    /// Make a new Stream using the session `sess` performing I/O
    /// concurrently over the socket `sock`.
    pub fn new(sess: &'a mut ClientSession, sock: &'a mut T) -> Stream<'a, T> {
        Stream { sess, sock }
    }
}

fn broken(err: TlsError) -> std::io::Error {
    match err {
        TlsError::Io(inner) => inner,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
    }
}

impl<'a, T> Read for Stream<'a, T>
where
    T: 'a + Read + Write,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.sess.read_into(self.sock, buf).map_err(broken)
    }
}

impl<'a, T> Write for Stream<'a, T>
where
    T: 'a + Read + Write,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.sess.write(self.sock, buf).map_err(broken)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.sock.flush()
    }
}
