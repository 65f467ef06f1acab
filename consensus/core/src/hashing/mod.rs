pub mod header;
pub mod tx;

use lumen_hashes::HashWriter;

/// Length-prefixed field writers used by the header and transaction hashers
pub(crate) trait HashWriterExtensions {
    fn write_u8(&mut self, v: u8) -> &mut Self;
    fn write_u16(&mut self, v: u16) -> &mut Self;
    fn write_u32(&mut self, v: u32) -> &mut Self;
    fn write_u64(&mut self, v: u64) -> &mut Self;
    fn write_bool(&mut self, v: bool) -> &mut Self;
    fn write_len(&mut self, len: usize) -> &mut Self;
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self;
}

impl HashWriterExtensions for HashWriter {
    fn write_u8(&mut self, v: u8) -> &mut Self {
        self.update([v])
    }

    fn write_u16(&mut self, v: u16) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    fn write_u32(&mut self, v: u32) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    fn write_u64(&mut self, v: u64) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(v as u8)
    }

    fn write_len(&mut self, len: usize) -> &mut Self {
        self.write_u64(len as u64)
    }

    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_len(bytes.len()).update(bytes)
    }
}
