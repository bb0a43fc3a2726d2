use crate::error::TlsError;
use crate::msgs::enums::{ExtensionType, NamedGroup};

/// Read from a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    offs: usize,
}

impl<'a> Reader<'a> {
    pub fn init(bytes: &[u8]) -> Reader {
        Reader {
            buf: bytes,
            offs: 0,
        }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let ret = &self.buf[self.offs..];
        self.offs = self.buf.len();
        ret
    }

    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.left() < len {
            return None;
        }

        let current = self.offs;
        self.offs += len;
        Some(&self.buf[current..current + len])
    }

    pub fn any_left(&self) -> bool {
        self.offs < self.buf.len()
    }

    pub fn left(&self) -> usize {
        self.buf.len() - self.offs
    }

    pub fn used(&self) -> usize {
        self.offs
    }

    pub fn sub(&mut self, len: usize) -> Option<Reader<'a>> {
        self.take(len).map(Reader::init)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take(len).map(|_| ())
    }

    /// A slice whose length is given by a leading u8.
    pub fn take_vec_u8(&mut self) -> Option<&'a [u8]> {
        let len = read_u8(self)? as usize;
        self.take(len)
    }

    /// A slice whose length is given by a leading u16.
    pub fn take_vec_u16(&mut self) -> Option<&'a [u8]> {
        let len = read_u16(self)? as usize;
        self.take(len)
    }

    /// A slice whose length is given by a leading u24.
    pub fn take_vec_u24(&mut self) -> Option<&'a [u8]> {
        let len = read_u24(self)? as usize;
        self.take(len)
    }

    pub fn expect_empty(&self) -> Result<(), TlsError> {
        if self.any_left() {
            Err(TlsError::DecodeError)
        } else {
            Ok(())
        }
    }
}

/// Things we can encode and read from a Reader.
pub trait Codec: Sized {
    fn put(&self, w: &mut Writer) -> Result<(), TlsError>;
    fn read(r: &mut Reader) -> Option<Self>;
}

pub fn read_u8(r: &mut Reader) -> Option<u8> {
    r.take(1).map(|b| b[0])
}

pub fn read_u16(r: &mut Reader) -> Option<u16> {
    r.take(2).map(|b| (u16::from(b[0]) << 8) | u16::from(b[1]))
}

pub fn read_u24(r: &mut Reader) -> Option<u32> {
    r.take(3)
        .map(|b| (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]))
}

pub fn put_u16(v: u16, out: &mut [u8]) {
    out[0] = (v >> 8) as u8;
    out[1] = v as u8;
}

pub fn put_u64(v: u64, out: &mut [u8]) {
    out[..8].copy_from_slice(&v.to_be_bytes());
}

/// Append-only writer over a fixed caller-owned buffer.
///
/// Nested length prefixes are produced with the `lengthed_*` functions,
/// which reserve the prefix, run the body, then backfill the length.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Writer<'a> {
        Writer { buf, used: 0 }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), TlsError> {
        if self.used + bytes.len() > self.buf.len() {
            return Err(TlsError::BufferOverflow);
        }

        self.buf[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<(), TlsError> {
        self.put_bytes(&[v])
    }

    pub fn put_u16(&mut self, v: u16) -> Result<(), TlsError> {
        self.put_bytes(&v.to_be_bytes())
    }

    pub fn put_u24(&mut self, v: u32) -> Result<(), TlsError> {
        self.put_bytes(&v.to_be_bytes()[1..])
    }

    /// Emit `items` as a u16-lengthed vector of u16-valued enums.
    pub fn put_u16_list(&mut self, items: &[u16]) -> Result<(), TlsError> {
        self.lengthed_u16(|w| {
            for item in items {
                w.put_u16(*item)?;
            }
            Ok(())
        })
    }

    /// Body produced by `f` is prefixed with its u8 length.
    pub fn lengthed_u8<F>(&mut self, f: F) -> Result<(), TlsError>
    where
        F: FnOnce(&mut Writer<'a>) -> Result<(), TlsError>,
    {
        self.put_u8(0)?;
        let mark = self.used;
        f(&mut *self)?;
        let len = self.used - mark;
        if len > 0xff {
            return Err(TlsError::BufferOverflow);
        }
        self.buf[mark - 1] = len as u8;
        Ok(())
    }

    /// Body produced by `f` is prefixed with its u16 length.
    pub fn lengthed_u16<F>(&mut self, f: F) -> Result<(), TlsError>
    where
        F: FnOnce(&mut Writer<'a>) -> Result<(), TlsError>,
    {
        self.put_u16(0)?;
        let mark = self.used;
        f(&mut *self)?;
        let len = self.used - mark;
        if len > 0xffff {
            return Err(TlsError::BufferOverflow);
        }
        put_u16(len as u16, &mut self.buf[mark - 2..]);
        Ok(())
    }

    /// Body produced by `f` is prefixed with its u24 length.
    pub fn lengthed_u24<F>(&mut self, f: F) -> Result<(), TlsError>
    where
        F: FnOnce(&mut Writer<'a>) -> Result<(), TlsError>,
    {
        self.put_u24(0)?;
        let mark = self.used;
        f(&mut *self)?;
        let len = self.used - mark;
        if len > 0xff_ffff {
            return Err(TlsError::BufferOverflow);
        }
        let be = (len as u32).to_be_bytes();
        self.buf[mark - 3..mark].copy_from_slice(&be[1..]);
        Ok(())
    }

    /// Emit one extension: type, then u16-lengthed body.
    pub fn extension<F>(&mut self, typ: ExtensionType, f: F) -> Result<(), TlsError>
    where
        F: FnOnce(&mut Writer<'a>) -> Result<(), TlsError>,
    {
        self.put_u16(typ.get_u16())?;
        self.lengthed_u16(f)
    }

    /// Emit one key_share entry: group, then u16-lengthed key.
    pub fn key_share_entry(&mut self, group: NamedGroup, key: &[u8]) -> Result<(), TlsError> {
        self.put_u16(group.get_u16())?;
        self.lengthed_u16(|w| w.put_bytes(key))
    }

    /// Emit a server_name extension holding one DNS host_name.
    pub fn sni_extension(&mut self, host: &str) -> Result<(), TlsError> {
        self.extension(ExtensionType::ServerName, |w| {
            w.lengthed_u16(|w| {
                w.put_u8(0)?; // name_type: host_name
                w.lengthed_u16(|w| w.put_bytes(host.as_bytes()))
            })
        })
    }
}
