//! Little-endian binary serialization primitives used by the wave formats and
//! the persisted sound caches.

mod error;
mod from_bytes;
mod reader;
mod to_bytes;
mod writer;

pub use self::error::{ConversionError, ConversionErrorType, ConversionResult, ConversionResultExt};
pub use self::from_bytes::{FromBytes, FromBytesExt};
pub use self::reader::ByteReader;
pub use self::to_bytes::ToBytes;
pub use self::writer::ByteWriter;

#[cfg(test)]
mod conversion {
    use crate::{ByteReader, ByteWriter, FromBytes, ToBytes};

    fn encode_decode<T: FromBytes + ToBytes>(input: &[u8]) {
        let mut byte_reader = ByteReader::new(input);

        let data = T::from_bytes(&mut byte_reader).unwrap();

        let mut byte_writer = ByteWriter::new();
        data.to_bytes(&mut byte_writer).unwrap();
        let bytes = byte_writer.into_inner();

        assert_eq!(input, bytes.as_slice());
    }

    #[test]
    fn u8() {
        encode_decode::<u8>(&[170]);
    }

    #[test]
    fn u16() {
        encode_decode::<u16>(&[170, 85]);
    }

    #[test]
    fn u32() {
        encode_decode::<u32>(&[170, 85, 170, 85]);
    }

    #[test]
    fn u64() {
        encode_decode::<u64>(&[170, 85, 170, 85, 170, 85, 170, 85]);
    }

    #[test]
    fn i8() {
        encode_decode::<i8>(&[170]);
    }

    #[test]
    fn i16() {
        encode_decode::<i16>(&[170, 85]);
    }

    #[test]
    fn i32() {
        encode_decode::<i32>(&[170, 85, 170, 85]);
    }

    #[test]
    fn i64() {
        encode_decode::<i64>(&[170, 85, 170, 85, 170, 85, 170, 85]);
    }

    #[test]
    fn array() {
        encode_decode::<[u8; 4]>(&[1, 2, 3, 4]);
    }

    #[test]
    fn vector() {
        encode_decode::<Vec<u8>>(&[1, 2, 3, 4]);
    }

    #[test]
    fn full_length_string() {
        use crate::FromBytesExt;

        let mut byte_reader = ByteReader::new(&[65, 65, 65, 65]);

        assert_eq!(String::from_n_bytes(&mut byte_reader, 4).unwrap(), "AAAA")
    }
}
