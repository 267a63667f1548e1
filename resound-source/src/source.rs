use std::sync::{Arc, Mutex};

#[cfg(feature = "debug")]
use resound_debug::logging::{Colorize, print_debug};
use resound_formats::{Sentence, WaveFormatTag, decode_sentence};

use crate::StreamDescriptor;

pub(crate) enum SentenceSlot {
    Unresolved,
    Absent,
    Present(Arc<Sentence>),
}

/// Decodes the sentence blob of a record the first time it is requested. The
/// outcome is cached either way, so an absent or invalid sentence answers in
/// constant time from then on.
pub(crate) fn resolve_sentence(slot: &Mutex<SentenceSlot>, blob: Option<&[u8]>, path: &str) -> Option<Arc<Sentence>> {
    let mut slot = slot.lock().unwrap();

    match &*slot {
        SentenceSlot::Present(sentence) => Some(Arc::clone(sentence)),
        SentenceSlot::Absent => None,
        SentenceSlot::Unresolved => match blob.and_then(decode_sentence).map(Arc::new) {
            Some(sentence) => {
                *slot = SentenceSlot::Present(Arc::clone(&sentence));
                Some(sentence)
            }
            None => {
                #[cfg(feature = "debug")]
                if blob.is_some() {
                    print_debug!("discarding invalid sentence data of {}", path.magenta());
                }
                #[cfg(not(feature = "debug"))]
                let _ = path;

                *slot = SentenceSlot::Absent;
                None
            }
        },
    }
}

/// An owned view into sample memory handed to the mixer. The backing bytes
/// stay alive for as long as the chunk does, independent of cache eviction.
#[derive(Clone)]
pub struct AudioChunk {
    bytes: Arc<[u8]>,
    offset: usize,
    length: usize,
    sample_count: usize,
}

impl AudioChunk {
    pub(crate) fn new(bytes: Arc<[u8]>, offset: usize, length: usize, sample_count: usize) -> Self {
        Self {
            bytes,
            offset,
            length,
            sample_count,
        }
    }

    /// The sample bytes of this chunk.
    pub fn data(&self) -> &[u8] {
        &self.bytes[self.offset..self.offset + self.length]
    }

    /// How many sample frames this chunk covers. Smaller than the requested
    /// count when the read was truncated at the lookahead boundary or the
    /// end of the body.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// The operations the mixer uses against any playable sound, independent of
/// how its body is stored.
pub trait AudioSource: Send + Sync {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Bytes per sample frame. One for block-compressed bodies.
    fn sample_size(&self) -> u32;

    /// True decoded sample count of the asset.
    fn sample_count(&self) -> u64;

    fn format(&self) -> WaveFormatTag;

    fn is_looped(&self) -> bool;

    /// Discriminates the streaming variant.
    fn is_streaming(&self) -> bool;

    /// Returns up to `request_count` samples starting at `sample_position`.
    /// `None` means no data is available for that span right now and the
    /// mixer should render silence; this call never blocks on disk.
    fn get_output_data(&self, sample_position: u64, request_count: usize) -> Option<AudioChunk>;

    /// The phoneme sentence of the asset, if it carries a valid one.
    fn sentence(&self) -> Option<Arc<Sentence>>;

    /// Nearest zero crossing at or before the sample. Only PCM sources
    /// search the body; block-compressed sources return the input unchanged.
    fn zero_crossing_before(&self, sample: u64) -> u64;

    /// Nearest zero crossing at or after the sample.
    fn zero_crossing_after(&self, sample: u64) -> u64;

    /// Maps a decoded sample position to a stream byte position using the
    /// XMA seek table. Other formats report zero.
    fn sample_to_stream_position(&self, sample: u64) -> u64;

    /// Inverse of [`sample_to_stream_position`](Self::sample_to_stream_position).
    fn stream_to_sample_position(&self, position: u64) -> u64;

    /// The descriptor the external streaming reader consumes. `None` for
    /// in-memory sources.
    fn stream_descriptor(&self) -> Option<StreamDescriptor>;

    /// Binds one more mixer instance to this source.
    fn reference_add(&self);

    /// Releases one mixer instance.
    fn reference_remove(&self);

    /// Whether no mixer instance is bound anymore and the source may be
    /// destroyed.
    fn can_delete(&self) -> bool;
}

/// RAII binding between a mixer instance and its source. Holding the
/// attachment keeps the source referenced; dropping it releases the
/// reference, which may unload a play-once body.
pub struct MixerAttachment {
    source: Arc<dyn AudioSource>,
    stream_position: u64,
}

impl MixerAttachment {
    pub fn new(source: Arc<dyn AudioSource>, initial_stream_position: u64) -> Self {
        source.reference_add();

        Self {
            source,
            stream_position: initial_stream_position,
        }
    }

    pub fn source(&self) -> &Arc<dyn AudioSource> {
        &self.source
    }

    /// Byte position the mixer's streaming reader starts at.
    pub fn stream_position(&self) -> u64 {
        self.stream_position
    }
}

impl Drop for MixerAttachment {
    fn drop(&mut self) {
        self.source.reference_remove();
    }
}

/// Creates a mixer instance bound to the source, increasing its reference
/// count for the attachment's lifetime.
pub fn create_mixer(source: Arc<dyn AudioSource>, initial_stream_position: u64) -> MixerAttachment {
    MixerAttachment::new(source, initial_stream_position)
}
