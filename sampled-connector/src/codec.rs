//! Byte-level primitives of the on-chain event wire format.
//!
//! Every event record is framed as a 4-byte little-endian length prefix
//! followed by that many ASCII bytes of type tag (`event_SampleUploaded`
//! and friends), then the fields in declaration order:
//!
//! - `u64` — 8 bytes little-endian
//! - account reference — 1 tag byte (account vs. contract) + 32 raw bytes
//! - currency amount — 1 length byte `n` + `n` little-endian magnitude
//!   bytes of an unsigned big integer; `n == 0` encodes zero
//! - string — 4-byte little-endian length prefix + UTF-8 bytes
//!
//! The reader never panics on malformed input: every method returns `None`
//! once the cursor would run past the buffer. The writer mirror exists for
//! runtime-argument serialization and for tests.

use ethereum_types::U512;

/// Cursor over an event byte buffer.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Some(u64::from_le_bytes(raw))
    }

    /// Reads the length-prefixed type tag at the start of a record.
    pub fn read_tag(&mut self) -> Option<String> {
        self.read_string()
    }

    /// Reads an account reference, skipping the account/contract tag byte.
    pub fn read_account(&mut self) -> Option<[u8; 32]> {
        let _variant = self.read_u8()?;
        let bytes = self.take(32)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(bytes);
        Some(raw)
    }

    /// Reads a variable-width unsigned currency amount.
    pub fn read_u512(&mut self) -> Option<U512> {
        let len = self.read_u8()? as usize;
        if len > 64 {
            return None;
        }
        let bytes = self.take(len)?;
        Some(U512::from_little_endian(bytes))
    }

    pub fn read_string(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

/// Builds event/argument byte buffers in the same wire format.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_tag(&mut self, tag: &str) {
        self.write_string(tag);
    }

    /// Writes an account reference with the account-variant tag byte.
    pub fn write_account(&mut self, account: &[u8; 32]) {
        self.buf.push(0);
        self.buf.extend_from_slice(account);
    }

    /// Writes a currency amount as its minimal little-endian magnitude.
    pub fn write_u512(&mut self, value: U512) {
        let len = value.bits().div_ceil(8);
        self.buf.push(len as u8);
        for i in 0..len {
            self.buf.push(value.byte(i));
        }
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
