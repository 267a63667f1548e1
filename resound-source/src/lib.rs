//! The wave source objects served to the mixer: in-memory sources that mix
//! straight out of cached lookahead data and the async body cache, and
//! streaming sources that hand the mixer a descriptor for its own reader.

mod describe;
mod memory;
mod source;
mod streaming;
mod transport;

pub use self::describe::{DescribeError, describe};
pub use self::memory::{MemorySourceSettings, MemoryWaveSource};
pub use self::source::{AudioChunk, AudioSource, MixerAttachment, create_mixer};
pub use self::streaming::{StreamDescriptor, StreamingWaveSource, XmaLoopInfo};
pub use self::transport::convert_looped_position;

/// Body sizes above this threshold always take the asynchronous body path,
/// regardless of any cached lookahead data.
pub const DEFAULT_ASYNC_MINIMUM_SIZE: u32 = 262_144;
