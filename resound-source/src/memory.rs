use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use resound_cache::{BodyKey, WaveDataCache};
use resound_formats::{SeekTable, Sentence, WaveFormatTag};
use resound_store::CachedWaveInfo;

use crate::DEFAULT_ASYNC_MINIMUM_SIZE;
use crate::source::{AudioChunk, AudioSource, SentenceSlot, resolve_sentence};
use crate::streaming::StreamDescriptor;
use crate::transport::convert_looped_position;

/// Creation settings of an in-memory wave source.
#[derive(Clone, Copy)]
pub struct MemorySourceSettings {
    /// Play-once sources unload their body from the cache when the last
    /// mixer instance detaches.
    pub play_once: bool,
    /// Bodies above this size always take the asynchronous path, regardless
    /// of any cached lookahead data.
    pub async_minimum_size: u32,
}

impl Default for MemorySourceSettings {
    fn default() -> Self {
        Self {
            play_once: false,
            async_minimum_size: DEFAULT_ASYNC_MINIMUM_SIZE,
        }
    }
}

/// A wave source whose body lives in memory, either as the lookahead prefix
/// embedded in its cache record or mounted in the wave data cache.
pub struct MemoryWaveSource {
    path: String,
    info: Arc<CachedWaveInfo>,
    cache: WaveDataCache,
    lookahead: Option<Arc<[u8]>>,
    seek_table: Option<SeekTable>,
    force_async: bool,
    play_once: bool,
    body_key: Mutex<Option<BodyKey>>,
    sentence: Mutex<SentenceSlot>,
    reference_count: AtomicU32,
}

fn fixup_unsigned_samples(bytes: &mut [u8]) {
    for byte in bytes {
        *byte = byte.wrapping_sub(128);
    }
}

fn parse_seek_table(info: &CachedWaveInfo) -> Option<SeekTable> {
    if info.format != Some(WaveFormatTag::Xma) {
        return None;
    }

    let header = info.header.as_ref()?;
    let entries = header.chunks_exact(4).map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect();

    Some(SeekTable::new(entries))
}

impl MemoryWaveSource {
    /// Creates a source for the normalized asset path from its cache record.
    /// No disk access happens until playback outruns the lookahead data.
    pub fn new(path: &str, info: Arc<CachedWaveInfo>, cache: WaveDataCache, settings: MemorySourceSettings) -> Self {
        let lookahead: Option<Arc<[u8]>> = info.cached_data.clone().map(Arc::from);
        let force_async = info.data_size > settings.async_minimum_size || lookahead.is_none();
        let seek_table = parse_seek_table(&info);

        Self {
            path: path.to_owned(),
            info,
            cache,
            lookahead,
            seek_table,
            force_async,
            play_once: settings.play_once,
            body_key: Mutex::new(None),
            sentence: Mutex::new(SentenceSlot::Unresolved),
            reference_count: AtomicU32::new(0),
        }
    }

    fn needs_fixup(&self) -> bool {
        self.info.format == Some(WaveFormatTag::Pcm) && self.info.bits_per_sample == 8
    }

    /// Positions and counts used for body addressing, in sample-size units.
    fn body_sample_count(&self) -> u64 {
        self.info.sample_count as u64
    }

    /// Resolves the cache handle for the body, starting the asynchronous
    /// load on first use and restarting it after an invalidation. The load
    /// call is idempotent and also remounts a body that was evicted since.
    fn body_key(&self) -> BodyKey {
        let mut slot = self.body_key.lock().unwrap();

        let key = self.cache.async_load(&self.path, self.info.data_size, self.info.data_start);

        let (completed, valid) = self.cache.is_complete(key);
        if completed && !valid {
            self.cache.restart_load(key, &self.path, self.info.data_size, self.info.data_start);
        }

        *slot = Some(key);
        key
    }

    fn body_chunk(&self, byte_offset: usize, request_count: usize, sample_size: usize) -> Option<AudioChunk> {
        let key = self.body_key();

        if self.needs_fixup() {
            let _ = self.cache.post_process(key, fixup_unsigned_samples);
        }

        let (body, _post_processed) = self.cache.try_get_pointer(key)?;

        if byte_offset >= body.len() {
            return None;
        }

        let end = (byte_offset + request_count * sample_size).min(body.len());
        let count = (end - byte_offset) / sample_size;
        if count == 0 {
            return None;
        }

        Some(AudioChunk::new(body, byte_offset, count * sample_size, count))
    }

    /// The sample bytes currently reachable without disk access, preferring
    /// the full body over the lookahead prefix.
    fn resident_bytes(&self) -> Option<Arc<[u8]>> {
        let key = *self.body_key.lock().unwrap();

        if let Some(key) = key
            && let Some((body, _)) = self.cache.try_get_pointer(key)
        {
            return Some(body);
        }

        self.lookahead.clone()
    }

    fn frame_value(&self, bytes: &[u8], frame: usize) -> Option<i32> {
        let sample_size = self.info.sample_size() as usize;
        let offset = frame * sample_size;
        if offset + sample_size > bytes.len() {
            return None;
        }

        // Channel zero decides the crossing.
        match self.info.bits_per_sample {
            16 => Some(i16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as i32),
            _ => Some(bytes[offset] as i8 as i32),
        }
    }

    fn scan_zero_crossing(&self, sample: u64, forward: bool) -> u64 {
        if self.info.format != Some(WaveFormatTag::Pcm) {
            return sample;
        }

        let Some(bytes) = self.resident_bytes() else {
            return sample;
        };

        let mut position = sample as usize;
        let Some(start_value) = self.frame_value(&bytes, position) else {
            return sample;
        };
        if start_value == 0 {
            return sample;
        }

        loop {
            let next = match forward {
                true => position + 1,
                false => match position.checked_sub(1) {
                    Some(next) => next,
                    None => return position as u64,
                },
            };

            match self.frame_value(&bytes, next) {
                Some(value) if value == 0 || (value < 0) != (start_value < 0) => return next as u64,
                Some(_) => position = next,
                None => return position as u64,
            }
        }
    }
}

impl AudioSource for MemoryWaveSource {
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
        false
    }

    fn get_output_data(&self, sample_position: u64, request_count: usize) -> Option<AudioChunk> {
        let body_count = self.body_sample_count();
        let sample_position = convert_looped_position(sample_position, body_count, self.info.loop_start, self.format());

        if sample_position >= body_count {
            return None;
        }

        let request_count = request_count.min((body_count - sample_position) as usize);
        if request_count == 0 {
            return None;
        }

        let sample_size = self.info.sample_size() as usize;
        let byte_offset = sample_position as usize * sample_size;
        let requested_bytes = request_count * sample_size;

        if !self.force_async
            && let Some(lookahead) = &self.lookahead
            && byte_offset < lookahead.len()
        {
            let end = (byte_offset + requested_bytes).min(lookahead.len());
            let count = (end - byte_offset) / sample_size;

            if byte_offset + requested_bytes > lookahead.len() {
                // The span crosses the lookahead boundary: truncate the
                // answer and start mounting the body so the next request can
                // be served in full.
                let _ = self.body_key();
            }

            if count > 0 {
                return Some(AudioChunk::new(Arc::clone(lookahead), byte_offset, count * sample_size, count));
            }
        }

        self.body_chunk(byte_offset, request_count, sample_size)
    }

    fn sentence(&self) -> Option<Arc<Sentence>> {
        resolve_sentence(&self.sentence, self.info.sentence.as_deref(), &self.path)
    }

    fn zero_crossing_before(&self, sample: u64) -> u64 {
        self.scan_zero_crossing(sample, false)
    }

    fn zero_crossing_after(&self, sample: u64) -> u64 {
        self.scan_zero_crossing(sample, true)
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
        None
    }

    fn reference_add(&self) {
        self.reference_count.fetch_add(1, Ordering::SeqCst);
    }

    fn reference_remove(&self) {
        let previous = self.reference_count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "unbalanced reference count");

        if previous == 1 && self.play_once {
            let key = *self.body_key.lock().unwrap();
            if let Some(key) = key {
                self.cache.unload(key);
            }
        }
    }

    fn can_delete(&self) -> bool {
        self.reference_count.load(Ordering::SeqCst) == 0
    }
}
