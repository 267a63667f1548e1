use crate::{ConversionError, ConversionErrorType, ConversionResult};

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TemporaryLimit {
    frame_limit: usize,
    old_limit: usize,
}

/// A reader of bytes that iterates over borrowed data. It can produce single
/// bytes or slices of memory and tracks a limit so that composite structures
/// can never read past their declared size.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    limit: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new [`ByteReader`] over the given data.
    pub fn new(data: &'a [u8]) -> Self {
        let limit = data.len();

        Self { data, offset: 0, limit }
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.limit
    }

    /// Returns the count of bytes left before the current limit.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.offset)
    }

    pub(crate) fn install_limit<Caller>(&mut self, size: usize) -> ConversionResult<TemporaryLimit> {
        let frame_limit = self.offset + size;
        let old_limit = self.limit;

        if frame_limit > old_limit {
            return Err(ConversionError::from_error_type(ConversionErrorType::ByteReaderTooShort {
                type_name: std::any::type_name::<Caller>(),
            }));
        }

        self.limit = frame_limit;

        Ok(TemporaryLimit { frame_limit, old_limit })
    }

    pub(crate) fn uninstall_limit(&mut self, limits: TemporaryLimit) {
        self.offset = limits.frame_limit;
        self.limit = limits.old_limit;
    }

    fn check_upper_bound<Caller>(offset: usize, length: usize) -> ConversionResult<()> {
        match offset < length {
            true => Ok(()),
            false => Err(ConversionError::from_error_type(ConversionErrorType::ByteReaderTooShort {
                type_name: std::any::type_name::<Caller>(),
            })),
        }
    }

    #[inline(always)]
    fn byte_unchecked(&mut self) -> u8 {
        let byte = self.data[self.offset];
        self.offset += 1;
        byte
    }

    pub fn byte<Caller>(&mut self) -> ConversionResult<u8> {
        Self::check_upper_bound::<Caller>(self.offset, self.limit)?;
        Ok(self.byte_unchecked())
    }

    pub fn bytes<Caller, const LENGTH: usize>(&mut self) -> ConversionResult<[u8; LENGTH]> {
        Self::check_upper_bound::<Caller>(self.offset + LENGTH.saturating_sub(1), self.limit)?;

        let mut array = [0; LENGTH];
        for byte in array.iter_mut() {
            *byte = self.byte_unchecked();
        }

        Ok(array)
    }

    pub fn slice<Caller>(&mut self, count: usize) -> ConversionResult<&'a [u8]> {
        Self::check_upper_bound::<Caller>(self.offset + count, self.limit + 1)?;

        let start_index = self.offset;
        self.offset += count;

        Ok(&self.data[start_index..self.offset])
    }

    pub fn skip<Caller>(&mut self, count: usize) -> ConversionResult<()> {
        self.slice::<Caller>(count).map(|_| ())
    }

    pub fn remaining_bytes(&mut self) -> Vec<u8> {
        let data = self.data[self.offset..self.limit].to_vec();
        self.offset = self.limit;
        data
    }
}


#[cfg(test)]
mod byte {
    use crate::ByteReader;

    #[test]
    fn under_limit() {
        let mut byte_reader = ByteReader::new(&[9; 1]);

        assert_eq!(byte_reader.byte::<()>().unwrap(), 9);
    }

    #[test]
    fn over_limit() {
        let mut byte_reader = ByteReader::new(&[9; 1]);

        assert!(byte_reader.byte::<()>().is_ok());
        assert!(byte_reader.byte::<()>().is_err());
    }
}

#[cfg(test)]
mod bytes {
    use crate::ByteReader;

    #[test]
    fn under_limit() {
        let mut byte_reader = ByteReader::new(&[9; 4]);

        assert_eq!(byte_reader.bytes::<(), 4>().unwrap(), [9, 9, 9, 9]);
    }

    #[test]
    fn over_limit() {
        let mut byte_reader = ByteReader::new(&[9; 4]);

        assert!(byte_reader.bytes::<(), 5>().is_err());
    }
}

#[cfg(test)]
mod slice {
    use crate::ByteReader;

    #[test]
    fn smaller_than_limit() {
        let mut byte_reader = ByteReader::new(&[9; 4]);

        assert_eq!(byte_reader.slice::<()>(3).unwrap(), &[9, 9, 9]);
        assert_eq!(byte_reader.remaining_bytes().as_slice(), &[9]);
    }

    #[test]
    fn exactly_on_limit() {
        let mut byte_reader = ByteReader::new(&[9; 4]);

        assert_eq!(byte_reader.slice::<()>(4).unwrap(), &[9, 9, 9, 9]);
        assert!(byte_reader.is_empty());
    }

    #[test]
    fn bigger_than_limit() {
        let mut byte_reader = ByteReader::new(&[9; 4]);
        let result = byte_reader.slice::<()>(5);

        assert!(result.is_err());
    }
}
