use crate::{ByteReader, ConversionError, ConversionResult, ConversionResultExt};

/// Trait to deserialize from a [`ByteReader`].
pub trait FromBytes {
    /// Takes bytes from a [`ByteReader`] and deserializes them into a type
    /// `T`.
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self>
    where
        Self: Sized;
}

/// Extension trait for [`FromBytes`].
pub trait FromBytesExt: FromBytes {
    /// Takes a fixed number of bytes from the [`ByteReader`] and tries to
    /// deserialize them into a type `T`.
    fn from_n_bytes(byte_reader: &mut ByteReader, size: usize) -> ConversionResult<Self>
    where
        Self: Sized;
}

impl<T> FromBytesExt for T
where
    T: FromBytes,
{
    fn from_n_bytes(byte_reader: &mut ByteReader, size: usize) -> ConversionResult<Self>
    where
        Self: Sized,
    {
        let stack_frame = byte_reader.install_limit::<Self>(size)?;

        let value = T::from_bytes(byte_reader)?;

        byte_reader.uninstall_limit(stack_frame);

        Ok(value)
    }
}

impl FromBytes for u8 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        byte_reader.byte::<Self>()
    }
}

impl FromBytes for u16 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 2>()?))
    }
}

impl FromBytes for u32 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 4>()?))
    }
}

impl FromBytes for u64 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 8>()?))
    }
}

impl FromBytes for i8 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(byte_reader.byte::<Self>()? as i8)
    }
}

impl FromBytes for i16 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 2>()?))
    }
}

impl FromBytes for i32 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 4>()?))
    }
}

impl FromBytes for i64 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 8>()?))
    }
}

impl FromBytes for f32 {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        Ok(Self::from_le_bytes(byte_reader.bytes::<Self, 4>()?))
    }
}

impl<T: FromBytes, const SIZE: usize> FromBytes for [T; SIZE] {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        let mut items = Vec::with_capacity(SIZE);

        for _ in 0..SIZE {
            items.push(T::from_bytes(byte_reader).trace::<Self>()?);
        }

        items
            .try_into()
            .map_err(|_| ConversionError::from_message("array length mismatch"))
    }
}

impl FromBytes for String {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        let mut value = String::new();

        while let Ok(byte) = byte_reader.byte::<Self>() {
            match byte {
                0 => break,
                byte => value.push(byte as char),
            }
        }

        Ok(value)
    }
}

impl<T: FromBytes> FromBytes for Vec<T> {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        let mut vector = Vec::new();

        while !byte_reader.is_empty() {
            let item = T::from_bytes(byte_reader).trace::<Self>()?;
            vector.push(item);
        }

        Ok(vector)
    }
}
