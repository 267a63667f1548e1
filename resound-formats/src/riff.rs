use crate::FormatError;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_FORM: &[u8; 4] = b"WAVE";

#[derive(Clone, Copy)]
struct ChunkHeader {
    name: [u8; 4],
    size: usize,
    data_offset: usize,
}

/// Iterates the chunks of a RIFF/WAVE container over borrowed data.
///
/// Any chunk whose declared size reaches past the parent bounds poisons the
/// walker permanently; all subsequent queries report that no chunk is
/// available. Unknown chunks are skipped by simply calling [`next`](Self::next).
pub struct RiffWalker<'a> {
    data: &'a [u8],
    limit: usize,
    chunk: Option<ChunkHeader>,
}

impl<'a> RiffWalker<'a> {
    /// Opens a RIFF/WAVE container and positions the walker on its first
    /// chunk.
    pub fn open(data: &'a [u8]) -> Result<Self, FormatError> {
        if data.len() < 12 || &data[0..4] != RIFF_MAGIC || &data[8..12] != WAVE_FORM {
            return Err(FormatError::NotRiff);
        }

        let riff_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        // The RIFF size field covers the form tag plus all chunks.
        let limit = (8 + riff_size).min(data.len());

        let mut walker = Self {
            data,
            limit,
            chunk: None,
        };
        walker.chunk = walker.read_header(12);

        Ok(walker)
    }

    fn read_header(&self, offset: usize) -> Option<ChunkHeader> {
        if offset + 8 > self.limit {
            return None;
        }

        let name = [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ];
        let size = u32::from_le_bytes([
            self.data[offset + 4],
            self.data[offset + 5],
            self.data[offset + 6],
            self.data[offset + 7],
        ]) as usize;
        let data_offset = offset + 8;

        if data_offset + size > self.limit {
            return None;
        }

        Some(ChunkHeader { name, size, data_offset })
    }

    /// Returns the four-character name of the current chunk.
    pub fn chunk_name(&self) -> Option<[u8; 4]> {
        self.chunk.map(|chunk| chunk.name)
    }

    /// Returns the payload size of the current chunk, or zero when no chunk
    /// is available.
    pub fn chunk_size(&self) -> usize {
        self.chunk.map(|chunk| chunk.size).unwrap_or(0)
    }

    /// Returns the file position of the current chunk's payload.
    pub fn chunk_position(&self) -> usize {
        self.chunk.map(|chunk| chunk.data_offset).unwrap_or(0)
    }

    /// Returns the whole payload of the current chunk.
    pub fn chunk_data(&self) -> Option<&'a [u8]> {
        self.chunk.map(|chunk| &self.data[chunk.data_offset..chunk.data_offset + chunk.size])
    }

    /// Copies the whole payload of the current chunk into the given buffer.
    /// The buffer must be at least as big as the chunk.
    pub fn read_chunk_into(&self, buffer: &mut [u8]) -> Option<usize> {
        let chunk_data = self.chunk_data()?;

        if buffer.len() < chunk_data.len() {
            return None;
        }

        buffer[..chunk_data.len()].copy_from_slice(chunk_data);
        Some(chunk_data.len())
    }

    /// Returns up to `count` bytes of the current chunk's payload without
    /// advancing.
    pub fn read_partial(&self, count: usize) -> Option<&'a [u8]> {
        let chunk_data = self.chunk_data()?;
        let count = count.min(chunk_data.len());

        Some(&chunk_data[..count])
    }

    /// Reads one little-endian 32-bit integer from the start of the current
    /// chunk without advancing.
    pub fn read_i32_le(&self) -> Option<i32> {
        let bytes = self.read_partial(4)?;
        let bytes: [u8; 4] = bytes.try_into().ok()?;

        Some(i32::from_le_bytes(bytes))
    }

    /// Advances to the next sibling chunk. Returns `false` once the parent
    /// is exhausted. Chunks are word aligned, so odd payloads carry a pad
    /// byte.
    pub fn next(&mut self) -> bool {
        let Some(chunk) = self.chunk else {
            return false;
        };

        let mut offset = chunk.data_offset + chunk.size;
        if chunk.size % 2 != 0 {
            offset += 1;
        }

        self.chunk = self.read_header(offset);
        self.chunk.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::RiffWalker;
    use crate::FormatError;

    fn build_riff(chunks: &[([u8; 4], &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");

        for (name, data) in chunks {
            body.extend_from_slice(name);
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(data);
            if data.len() % 2 != 0 {
                body.push(0);
            }
        }

        let mut file = Vec::new();
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend_from_slice(&body);
        file
    }

    #[test]
    fn open_rejects_other_containers() {
        assert!(matches!(RiffWalker::open(b"FORM\x00\x00\x00\x04AIFF"), Err(FormatError::NotRiff)));
        assert!(matches!(RiffWalker::open(b"RI"), Err(FormatError::NotRiff)));
    }

    #[test]
    fn iterates_sibling_chunks() {
        let file = build_riff(&[(*b"fmt ", &[1, 2, 3, 4]), (*b"data", &[9, 9])]);
        let mut walker = RiffWalker::open(&file).unwrap();

        assert_eq!(walker.chunk_name(), Some(*b"fmt "));
        assert_eq!(walker.chunk_size(), 4);
        assert_eq!(walker.chunk_data(), Some([1, 2, 3, 4].as_slice()));

        assert!(walker.next());
        assert_eq!(walker.chunk_name(), Some(*b"data"));
        assert_eq!(walker.chunk_position(), file.len() - 2);

        assert!(!walker.next());
        assert_eq!(walker.chunk_name(), None);
        assert_eq!(walker.chunk_size(), 0);
    }

    #[test]
    fn odd_chunks_are_padded() {
        let file = build_riff(&[(*b"fmt ", &[1, 2, 3]), (*b"data", &[7])]);
        let mut walker = RiffWalker::open(&file).unwrap();

        assert!(walker.next());
        assert_eq!(walker.chunk_name(), Some(*b"data"));
        assert_eq!(walker.chunk_data(), Some([7].as_slice()));
    }

    #[test]
    fn truncated_chunk_poisons_the_walker() {
        let mut file = build_riff(&[(*b"data", &[1, 2, 3, 4])]);
        // Lie about the chunk size so it reaches past the parent.
        file[16] = 200;

        let walker = RiffWalker::open(&file).unwrap();
        assert_eq!(walker.chunk_name(), None);
        assert_eq!(walker.chunk_data(), None);
    }

    #[test]
    fn read_partial_and_i32() {
        let file = build_riff(&[(*b"cue ", &5i32.to_le_bytes())]);
        let walker = RiffWalker::open(&file).unwrap();

        assert_eq!(walker.read_i32_le(), Some(5));
        assert_eq!(walker.read_partial(2), Some([5, 0].as_slice()));
        // Reading does not advance.
        assert_eq!(walker.chunk_name(), Some(*b"cue "));
    }

    #[test]
    fn read_chunk_into_requires_capacity() {
        let file = build_riff(&[(*b"data", &[1, 2, 3, 4])]);
        let walker = RiffWalker::open(&file).unwrap();

        let mut small = [0; 2];
        assert_eq!(walker.read_chunk_into(&mut small), None);

        let mut buffer = [0; 8];
        assert_eq!(walker.read_chunk_into(&mut buffer), Some(4));
        assert_eq!(&buffer[..4], &[1, 2, 3, 4]);
    }
}
