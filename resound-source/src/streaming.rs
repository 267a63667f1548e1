use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use resound_formats::{SeekTable, Sentence, WaveFormatTag};
use resound_store::CachedWaveInfo;

use crate::source::{AudioChunk, AudioSource, SentenceSlot, resolve_sentence};
use crate::transport::convert_looped_position;

/// XMA loop placement consumed by the hardware decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XmaLoopInfo {
    pub block: i32,
    pub leading_samples: i32,
    pub trailing_samples: i32,
}

/// Callbacks a streaming reader drives while it plays a descriptor.
trait StreamCallbacks: Send + Sync {
    fn on_loop(&self, sample_position: u64) -> u64;
    fn on_samples_decoded(&self, samples: &mut [u8]);
}

/// Everything the external streaming mixer needs to read and decode one
/// asset on its own: the body extent, the sample layout, loop placement and
/// the position/loop callbacks.
#[derive(Clone)]
pub struct StreamDescriptor {
    pub file_path: String,
    pub data_start: u32,
    pub data_size: u32,
    pub sample_size: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: WaveFormatTag,
    pub loop_info: XmaLoopInfo,
    callbacks: Arc<dyn StreamCallbacks>,
}

impl StreamDescriptor {
    /// Normalizes a playback position that ran past the end of the body.
    pub fn on_loop(&self, sample_position: u64) -> u64 {
        self.callbacks.on_loop(sample_position)
    }

    /// Post-processes freshly decoded samples in place before they reach the
    /// mixer.
    pub fn on_samples_decoded(&self, samples: &mut [u8]) {
        self.callbacks.on_samples_decoded(samples)
    }
}

struct StreamState {
    sample_count: u64,
    loop_start: i32,
    format: WaveFormatTag,
    unsigned_samples: bool,
}

impl StreamCallbacks for StreamState {
    fn on_loop(&self, sample_position: u64) -> u64 {
        convert_looped_position(sample_position, self.sample_count, self.loop_start, self.format)
    }

    fn on_samples_decoded(&self, samples: &mut [u8]) {
        if self.unsigned_samples {
            for sample in samples {
                *sample = sample.wrapping_sub(128);
            }
        }
    }
}

/// A wave source that owns no body at all. Every playback instance drives
/// its own streaming reader against the descriptor; the source only answers
/// metadata queries.
pub struct StreamingWaveSource {
    path: String,
    info: Arc<CachedWaveInfo>,
    seek_table: Option<SeekTable>,
    sentence: Mutex<SentenceSlot>,
    reference_count: AtomicU32,
}

impl StreamingWaveSource {
    /// Creates a streaming source for the normalized asset path from its
    /// cache record.
    pub fn new(path: &str, info: Arc<CachedWaveInfo>) -> Self {
        let seek_table = match info.format {
            Some(WaveFormatTag::Xma) => info.header.as_ref().map(|header| {
                SeekTable::new(
                    header
                        .chunks_exact(4)
                        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                        .collect(),
                )
            }),
            _ => None,
        };

        Self {
            path: path.to_owned(),
            info,
            seek_table,
            sentence: Mutex::new(SentenceSlot::Unresolved),
            reference_count: AtomicU32::new(0),
        }
    }
}

impl AudioSource for StreamingWaveSource {
    fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    fn sample_size(&self) -> u32 {
        self.info.sample_size()
    }

    fn sample_count(&self) -> u64 {
        self.info.decoded_sample_count as u64
    }

    fn format(&self) -> WaveFormatTag {
        self.info.format.unwrap_or(WaveFormatTag::Pcm)
    }

    fn is_looped(&self) -> bool {
        self.info.is_looped()
    }

    fn is_streaming(&self) -> bool {
        true
    }

    /// The streaming mixer owns its reader and never asks the source for
    /// bytes.
    fn get_output_data(&self, _sample_position: u64, _request_count: usize) -> Option<AudioChunk> {
        None
    }

    fn sentence(&self) -> Option<Arc<Sentence>> {
        resolve_sentence(&self.sentence, self.info.sentence.as_deref(), &self.path)
    }

    fn zero_crossing_before(&self, sample: u64) -> u64 {
        sample
    }

    fn zero_crossing_after(&self, sample: u64) -> u64 {
        sample
    }

    fn sample_to_stream_position(&self, sample: u64) -> u64 {
        match &self.seek_table {
            Some(seek_table) => seek_table.sample_to_stream_position(sample as u32),
            None => {
                debug_assert!(false, "seek table positioning on a non-XMA source");
                0
            }
        }
    }

    fn stream_to_sample_position(&self, position: u64) -> u64 {
        match &self.seek_table {
            Some(seek_table) => seek_table.stream_to_sample_position(position, self.info.decoded_sample_count) as u64,
            None => {
                debug_assert!(false, "seek table positioning on a non-XMA source");
                0
            }
        }
    }

    fn stream_descriptor(&self) -> Option<StreamDescriptor> {
        let info = &self.info;

        let callbacks = Arc::new(StreamState {
            sample_count: info.sample_count as u64,
            loop_start: info.loop_start,
            format: self.format(),
            unsigned_samples: info.format == Some(WaveFormatTag::Pcm) && info.bits_per_sample == 8,
        });

        Some(StreamDescriptor {
            file_path: self.path.clone(),
            data_start: info.data_start,
            data_size: info.data_size,
            sample_size: info.sample_size(),
            sample_rate: info.sample_rate,
            channels: info.channels,
            format: self.format(),
            loop_info: XmaLoopInfo {
                block: info.loop_block,
                leading_samples: info.leading_samples,
                trailing_samples: info.trailing_samples,
            },
            callbacks,
        })
    }

    fn reference_add(&self) {
        self.reference_count.fetch_add(1, Ordering::SeqCst);
    }

    fn reference_remove(&self) {
        let previous = self.reference_count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "unbalanced reference count");
    }

    fn can_delete(&self) -> bool {
        self.reference_count.load(Ordering::SeqCst) == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resound_formats::WaveFormatTag;
    use resound_store::CachedWaveInfo;

    use super::StreamingWaveSource;
    use crate::source::AudioSource;

    fn xma_info() -> Arc<CachedWaveInfo> {
        let seek_table: Vec<u8> = [25_000u32, 50_000, 75_000].iter().flat_map(|entry| entry.to_le_bytes()).collect();

        Arc::new(CachedWaveInfo {
            format: Some(WaveFormatTag::Xma),
            sample_rate: 44100,
            bits_per_sample: 16,
            channels: 2,
            data_start: 2048,
            data_size: 8192,
            loop_start: 1000,
            sample_count: 8192,
            decoded_sample_count: 100_000,
            loop_block: 2,
            leading_samples: 128,
            trailing_samples: 64,
            header: Some(seek_table),
            ..Default::default()
        })
    }

    fn pcm_info(bits_per_sample: u16, loop_start: i32) -> Arc<CachedWaveInfo> {
        Arc::new(CachedWaveInfo {
            format: Some(WaveFormatTag::Pcm),
            sample_rate: 22050,
            bits_per_sample,
            channels: 1,
            data_start: 44,
            data_size: 8820,
            loop_start,
            sample_count: 4410,
            decoded_sample_count: 4410,
            ..Default::default()
        })
    }

    #[test]
    fn streaming_sources_never_serve_bytes() {
        let source = StreamingWaveSource::new("sound/music.xwv", xma_info());

        assert!(source.is_streaming());
        assert!(source.get_output_data(0, 4096).is_none());
    }

    #[test]
    fn descriptor_carries_the_body_extent_and_loop_info() {
        let source = StreamingWaveSource::new("sound/music.xwv", xma_info());
        let descriptor = source.stream_descriptor().unwrap();

        assert_eq!(descriptor.file_path, "sound/music.xwv");
        assert_eq!(descriptor.data_start, 2048);
        assert_eq!(descriptor.data_size, 8192);
        assert_eq!(descriptor.sample_size, 1);
        assert_eq!(descriptor.format, WaveFormatTag::Xma);
        assert_eq!(descriptor.loop_info.block, 2);
        assert_eq!(descriptor.loop_info.leading_samples, 128);
        assert_eq!(descriptor.loop_info.trailing_samples, 64);
    }

    #[test]
    fn seek_table_positions_map_in_both_directions() {
        let source = StreamingWaveSource::new("sound/music.xwv", xma_info());

        assert_eq!(source.sample_to_stream_position(30_000), 2048);
        assert_eq!(source.stream_to_sample_position(2048), 25_000);
    }

    #[test]
    fn loop_callback_normalizes_positions() {
        let source = StreamingWaveSource::new("sound/loop.wav", pcm_info(16, 1000));
        let descriptor = source.stream_descriptor().unwrap();

        assert_eq!(descriptor.on_loop(999), 999);
        assert_eq!(descriptor.on_loop(4410), 1000);
        assert_eq!(descriptor.on_loop(5410), 2000);
    }

    #[test]
    fn sentence_lookup_caches_either_outcome() {
        let mut info = (*xma_info()).clone();
        info.sentence = Some(resound_formats::encode_sentence(b"phonemes"));

        let source = StreamingWaveSource::new("sound/talk.xwv", Arc::new(info));
        assert_eq!(source.sentence().unwrap().payload(), b"phonemes");
        assert_eq!(source.sentence().unwrap().payload(), b"phonemes");

        // A corrupt blob counts as absent, also on repeat lookups.
        let mut info = (*xma_info()).clone();
        info.sentence = Some(vec![0xFF; 8]);

        let source = StreamingWaveSource::new("sound/mute.xwv", Arc::new(info));
        assert!(source.sentence().is_none());
        assert!(source.sentence().is_none());
    }

    #[test]
    fn decoded_unsigned_samples_are_converted_in_place() {
        let source = StreamingWaveSource::new("sound/old.wav", pcm_info(8, -1));
        let descriptor = source.stream_descriptor().unwrap();

        let mut samples = [128u8, 129, 127, 0];
        descriptor.on_samples_decoded(&mut samples);
        assert_eq!(samples, [0, 1, 255, 128]);

        // Sixteen-bit streams pass through untouched.
        let source = StreamingWaveSource::new("sound/new.wav", pcm_info(16, -1));
        let descriptor = source.stream_descriptor().unwrap();

        let mut samples = [128u8, 129, 127, 0];
        descriptor.on_samples_decoded(&mut samples);
        assert_eq!(samples, [128, 129, 127, 0]);
    }
}
