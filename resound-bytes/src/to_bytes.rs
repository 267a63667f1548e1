use crate::{ByteWriter, ConversionResult, ConversionResultExt};

/// Trait to serialize into a [`ByteWriter`].
pub trait ToBytes {
    /// Converts self into bytes and appends them to the writer.
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()>;
}

impl ToBytes for u8 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.push(*self);
        Ok(())
    }
}

impl ToBytes for u16 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for u32 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for u64 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for i8 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.push(*self as u8);
        Ok(())
    }
}

impl ToBytes for i16 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for i32 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for i64 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl ToBytes for f32 {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        byte_writer.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl<T: ToBytes, const SIZE: usize> ToBytes for [T; SIZE] {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        for item in self.iter() {
            item.to_bytes(byte_writer).trace::<Self>()?;
        }

        Ok(())
    }
}

impl<T: ToBytes> ToBytes for Vec<T> {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        for item in self.iter() {
            item.to_bytes(byte_writer).trace::<Self>()?;
        }

        Ok(())
    }
}
