//! Parsers for the sound container formats served by the wave pipeline:
//! RIFF/WAVE (PCM and ADPCM), the preprocessed XWV container for XMA data,
//! and the embedded phoneme sentence blobs.

mod error;
mod riff;
mod sentence;
pub mod test_support;
mod wave;
mod xwv;

pub use self::error::FormatError;
pub use self::riff::RiffWalker;
pub use self::sentence::{SENTENCE_MAGIC, SENTENCE_VERSION, Sentence, decode_sentence, encode_sentence};
pub use self::wave::{AdpcmFormat, ParsedWave, WaveFormat, WaveFormatTag, adpcm_sample_count, parse_wave};
pub use self::xwv::{XMA_BLOCK_SIZE, XWV_MAGIC, XWV_VERSION, SeekTable, XwvFile, XwvFormat, XwvHeader, parse_xwv};
