use std::io::Read;

/// Magic tag of a phoneme sentence payload.
pub const SENTENCE_MAGIC: [u8; 4] = *b"VSNT";
/// Current sentence payload version.
pub const SENTENCE_VERSION: u8 = 1;

const LZMA_HEADER_SIZE: usize = 13;
const MAX_SENTENCE_SIZE: u64 = 1 << 20;
const MAX_DICT_SIZE: u32 = 1 << 27;
const DECOMPRESS_MEMORY_LIMIT_KB: u32 = 64 << 10;

/// An opaque phoneme track. The payload layout beyond the magic and version
/// byte belongs to the voice system; the cache only carries it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    payload: Vec<u8>,
}

impl Sentence {
    /// The phoneme payload, without the magic and version prefix.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Checks for the standard 13-byte raw-LZMA header: a properties byte, a
/// 32-bit dictionary size and a 64-bit uncompressed size.
fn looks_like_lzma(blob: &[u8]) -> bool {
    if blob.len() < LZMA_HEADER_SIZE || blob.starts_with(&SENTENCE_MAGIC) {
        return false;
    }

    let properties = blob[0];
    if properties >= 225 {
        return false;
    }

    let dict_size = u32::from_le_bytes([blob[1], blob[2], blob[3], blob[4]]);
    if dict_size > MAX_DICT_SIZE {
        return false;
    }

    let uncompressed_size = u64::from_le_bytes([
        blob[5], blob[6], blob[7], blob[8], blob[9], blob[10], blob[11], blob[12],
    ]);

    uncompressed_size == u64::MAX || (uncompressed_size > 0 && uncompressed_size <= MAX_SENTENCE_SIZE)
}

fn decompress(blob: &[u8]) -> Option<Vec<u8>> {
    let cursor = std::io::Cursor::new(blob);
    let mut reader = lzma_rust::LZMAReader::new_mem_limit(cursor, DECOMPRESS_MEMORY_LIMIT_KB, None).ok()?;

    let mut output = Vec::new();
    reader.read_to_end(&mut output).ok()?;
    Some(output)
}

/// Decodes a sentence blob as read from a `VDAT` chunk or an XWV container.
/// The blob may be LZMA compressed. Any failure, a wrong magic or an unknown
/// version means the sentence is treated as absent.
pub fn decode_sentence(blob: &[u8]) -> Option<Sentence> {
    let decompressed;
    let raw = match looks_like_lzma(blob) {
        true => {
            decompressed = decompress(blob)?;
            decompressed.as_slice()
        }
        false => blob,
    };

    if raw.len() < 5 || raw[0..4] != SENTENCE_MAGIC || raw[4] != SENTENCE_VERSION {
        return None;
    }

    Some(Sentence {
        payload: raw[5..].to_vec(),
    })
}

/// Serializes a sentence payload with its magic and version prefix, the form
/// stored in `VDAT` chunks and cache records.
pub fn encode_sentence(payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(payload.len() + 5);
    blob.extend_from_slice(&SENTENCE_MAGIC);
    blob.push(SENTENCE_VERSION);
    blob.extend_from_slice(payload);
    blob
}

#[cfg(test)]
mod tests {
    use super::{decode_sentence, encode_sentence};

    #[test]
    fn plain_round_trip() {
        let blob = encode_sentence(b"phonemes");

        let sentence = decode_sentence(&blob).unwrap();
        assert_eq!(sentence.payload(), b"phonemes");
    }

    #[test]
    fn empty_payload() {
        let blob = encode_sentence(b"");

        assert_eq!(decode_sentence(&blob).unwrap().payload(), b"");
    }

    #[test]
    fn wrong_magic_is_absent() {
        assert!(decode_sentence(b"VXXX\x01data").is_none());
        assert!(decode_sentence(b"").is_none());
    }

    #[test]
    fn wrong_version_is_absent() {
        let mut blob = encode_sentence(b"data");
        blob[4] = 9;

        assert!(decode_sentence(&blob).is_none());
    }

    #[test]
    fn corrupt_lzma_is_absent() {
        // A plausible 13-byte header followed by garbage has to fail the
        // decoder, not the caller.
        let mut blob = vec![93];
        blob.extend_from_slice(&(1u32 << 16).to_le_bytes());
        blob.extend_from_slice(&64u64.to_le_bytes());
        blob.extend_from_slice(&[0xFF; 32]);

        assert!(decode_sentence(&blob).is_none());
    }
}
