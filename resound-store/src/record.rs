use bitflags::bitflags;
use resound_bytes::{
    ByteReader, ByteWriter, ConversionError, ConversionErrorType, ConversionResult, ConversionResultExt, FromBytes, ToBytes,
};
use resound_formats::WaveFormatTag;

use crate::{CACHED_DATA_SIZE_LIMIT, MAX_HEADER_SIZE};

bitflags! {
    /// Presence bits of the optional record payloads plus the audio source
    /// kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InfoFlags: u8 {
        const SENTENCE = 0x01;
        const CACHED_DATA = 0x02;
        const HEADER = 0x04;
        const PRECACHE = 0x08;
        const KIND_MP3 = 0x10;
        const KIND_VOICE = 0x20;
    }
}

/// Which decoder family serves an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Wave,
    Mp3,
    Voice,
}

/// The persisted metadata of one sound asset: everything a wave source needs
/// to start playing without touching the container file.
///
/// Immutable once stored in a [`CachedInfoContainer`](crate::CachedInfoContainer).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedWaveInfo {
    /// `None` marks a record whose format field was zero on disk; it has to
    /// be rebuilt before use.
    pub format: Option<WaveFormatTag>,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub kind: SourceKind,
    pub precache: bool,
    pub data_start: u32,
    pub data_size: u32,
    /// Starting sample of the loop region, `-1` when the asset does not loop.
    pub loop_start: i32,
    pub sample_count: u32,
    /// True decoded sample count; differs from `sample_count` for ADPCM and
    /// XMA bodies.
    pub decoded_sample_count: u32,
    pub loop_block: i32,
    pub leading_samples: i32,
    pub trailing_samples: i32,
    /// Phoneme sentence blob, stored verbatim.
    pub sentence: Option<Vec<u8>>,
    /// Lookahead body: a prefix of the sample data that can be mixed without
    /// any disk access.
    pub cached_data: Option<Vec<u8>>,
    /// Format header blob: ADPCM coefficient table or XMA seek table.
    pub header: Option<Vec<u8>>,
}

impl CachedWaveInfo {
    /// Bytes per sample frame. Block-compressed bodies report one byte.
    pub fn sample_size(&self) -> u32 {
        match self.format {
            Some(WaveFormatTag::Pcm) | None => {
                let size = (self.bits_per_sample as u32 * self.channels as u32) / 8;
                size.max(1)
            }
            Some(WaveFormatTag::Adpcm) | Some(WaveFormatTag::Xma) => 1,
        }
    }

    pub fn is_looped(&self) -> bool {
        self.loop_start >= 0
    }

    /// A record read back with a zero format field carries no usable
    /// metadata and has to be rebuilt from the asset.
    pub fn needs_rebuild(&self) -> bool {
        self.format.is_none()
    }

    fn flags(&self) -> InfoFlags {
        let mut flags = InfoFlags::empty();
        flags.set(InfoFlags::SENTENCE, self.sentence.is_some());
        flags.set(InfoFlags::CACHED_DATA, self.cached_data.is_some());
        flags.set(InfoFlags::HEADER, self.header.is_some());
        flags.set(InfoFlags::PRECACHE, self.precache);
        flags.set(InfoFlags::KIND_MP3, self.kind == SourceKind::Mp3);
        flags.set(InfoFlags::KIND_VOICE, self.kind == SourceKind::Voice);
        flags
    }

    /// Packs format tag, sample width, channel count and sample rate into the
    /// leading info word. A zero format field marks the record as stale.
    fn pack_info(&self) -> u32 {
        let format_id = self.format.map(|format| format.id()).unwrap_or(0);
        let sixteen_bit = (self.bits_per_sample == 16) as u32;
        let stereo = (self.channels == 2) as u32;

        format_id | sixteen_bit << 2 | stereo << 3 | self.sample_rate << 4
    }

    fn unpack_info(&mut self, info: u32) {
        self.format = WaveFormatTag::from_id(info & 0x3);
        self.bits_per_sample = match info >> 2 & 0x1 {
            0 => 8,
            _ => 16,
        };
        self.channels = match info >> 3 & 0x1 {
            0 => 1,
            _ => 2,
        };
        self.sample_rate = info >> 4;
    }
}

impl ToBytes for CachedWaveInfo {
    fn to_bytes(&self, byte_writer: &mut ByteWriter) -> ConversionResult<()> {
        if let Some(cached_data) = &self.cached_data
            && cached_data.len() >= CACHED_DATA_SIZE_LIMIT
        {
            return Err(ConversionError::from_error_type(ConversionErrorType::DataTooBig {
                type_name: "cached data",
            }));
        }

        if let Some(header) = &self.header
            && header.len() > MAX_HEADER_SIZE
        {
            return Err(ConversionError::from_error_type(ConversionErrorType::DataTooBig {
                type_name: "format header",
            }));
        }

        self.pack_info().to_bytes(byte_writer)?;
        self.flags().bits().to_bytes(byte_writer)?;
        self.data_start.to_bytes(byte_writer)?;
        self.data_size.to_bytes(byte_writer)?;
        self.loop_start.to_bytes(byte_writer)?;
        self.sample_count.to_bytes(byte_writer)?;
        self.decoded_sample_count.to_bytes(byte_writer)?;

        if self.format == Some(WaveFormatTag::Xma) {
            self.loop_block.to_bytes(byte_writer)?;
            self.leading_samples.to_bytes(byte_writer)?;
            self.trailing_samples.to_bytes(byte_writer)?;
        }

        if let Some(sentence) = &self.sentence {
            (sentence.len() as u32).to_bytes(byte_writer)?;
            byte_writer.extend_from_slice(sentence);
        }

        if let Some(cached_data) = &self.cached_data {
            (cached_data.len() as u32).to_bytes(byte_writer)?;
            byte_writer.extend_from_slice(cached_data);
        }

        if let Some(header) = &self.header {
            (header.len() as u16).to_bytes(byte_writer)?;
            byte_writer.extend_from_slice(header);
        }

        Ok(())
    }
}

impl FromBytes for CachedWaveInfo {
    fn from_bytes(byte_reader: &mut ByteReader) -> ConversionResult<Self> {
        let mut record = CachedWaveInfo::default();

        let info = u32::from_bytes(byte_reader).trace::<Self>()?;
        record.unpack_info(info);

        let flags = InfoFlags::from_bits_truncate(u8::from_bytes(byte_reader).trace::<Self>()?);
        record.precache = flags.contains(InfoFlags::PRECACHE);
        record.kind = match (flags.contains(InfoFlags::KIND_MP3), flags.contains(InfoFlags::KIND_VOICE)) {
            (true, _) => SourceKind::Mp3,
            (false, true) => SourceKind::Voice,
            (false, false) => SourceKind::Wave,
        };

        record.data_start = u32::from_bytes(byte_reader).trace::<Self>()?;
        record.data_size = u32::from_bytes(byte_reader).trace::<Self>()?;
        record.loop_start = i32::from_bytes(byte_reader).trace::<Self>()?;
        record.sample_count = u32::from_bytes(byte_reader).trace::<Self>()?;
        record.decoded_sample_count = u32::from_bytes(byte_reader).trace::<Self>()?;

        if record.format == Some(WaveFormatTag::Xma) {
            record.loop_block = i32::from_bytes(byte_reader).trace::<Self>()?;
            record.leading_samples = i32::from_bytes(byte_reader).trace::<Self>()?;
            record.trailing_samples = i32::from_bytes(byte_reader).trace::<Self>()?;
        }

        if flags.contains(InfoFlags::SENTENCE) {
            let size = u32::from_bytes(byte_reader).trace::<Self>()?;
            record.sentence = Some(byte_reader.slice::<Self>(size as usize)?.to_vec());
        }

        if flags.contains(InfoFlags::CACHED_DATA) {
            let size = u32::from_bytes(byte_reader).trace::<Self>()?;
            record.cached_data = Some(byte_reader.slice::<Self>(size as usize)?.to_vec());
        }

        if flags.contains(InfoFlags::HEADER) {
            let size = u16::from_bytes(byte_reader).trace::<Self>()?;
            record.header = Some(byte_reader.slice::<Self>(size as usize)?.to_vec());
        }

        Ok(record)
    }
}

#[cfg(test)]
mod serialization {
    use resound_bytes::{ByteReader, ByteWriter, FromBytes, ToBytes};
    use resound_formats::WaveFormatTag;

    use super::{CachedWaveInfo, SourceKind};

    fn round_trip(record: &CachedWaveInfo) -> CachedWaveInfo {
        let mut writer = ByteWriter::new();
        record.to_bytes(&mut writer).unwrap();

        let bytes = writer.into_inner();
        let mut reader = ByteReader::new(&bytes);
        let restored = CachedWaveInfo::from_bytes(&mut reader).unwrap();
        assert!(reader.is_empty());

        restored
    }

    #[test]
    fn pcm_record() {
        let record = CachedWaveInfo {
            format: Some(WaveFormatTag::Pcm),
            sample_rate: 22050,
            bits_per_sample: 16,
            channels: 1,
            data_start: 44,
            data_size: 8820,
            loop_start: -1,
            sample_count: 4410,
            decoded_sample_count: 4410,
            cached_data: Some(vec![3; 5516]),
            ..Default::default()
        };

        assert_eq!(round_trip(&record), record);
    }

    #[test]
    fn record_with_all_payloads() {
        let record = CachedWaveInfo {
            format: Some(WaveFormatTag::Xma),
            sample_rate: 44100,
            bits_per_sample: 16,
            channels: 2,
            kind: SourceKind::Voice,
            precache: true,
            data_start: 2048,
            data_size: 1 << 16,
            loop_start: 1000,
            sample_count: 100_000,
            decoded_sample_count: 99_000,
            loop_block: 3,
            leading_samples: 128,
            trailing_samples: 64,
            sentence: Some(vec![1, 2, 3]),
            cached_data: Some(vec![9; 128]),
            header: Some(vec![4; 12]),
        };

        assert_eq!(round_trip(&record), record);
    }

    #[test]
    fn zero_format_needs_rebuild() {
        let record = CachedWaveInfo {
            format: None,
            sample_rate: 11025,
            ..Default::default()
        };

        let restored = round_trip(&record);
        assert!(restored.needs_rebuild());
        assert_eq!(restored.sample_rate, 11025);
    }

    #[test]
    fn oversized_cached_data_is_rejected() {
        let record = CachedWaveInfo {
            format: Some(WaveFormatTag::Pcm),
            cached_data: Some(vec![0; 65_535]),
            ..Default::default()
        };

        let mut writer = ByteWriter::new();
        assert!(record.to_bytes(&mut writer).is_err());
    }

    #[test]
    fn oversized_header_is_rejected() {
        let record = CachedWaveInfo {
            format: Some(WaveFormatTag::Adpcm),
            header: Some(vec![0; 40_000]),
            ..Default::default()
        };

        let mut writer = ByteWriter::new();
        assert!(record.to_bytes(&mut writer).is_err());
    }
}

#[cfg(test)]
mod sample_size {
    use resound_formats::WaveFormatTag;

    use super::CachedWaveInfo;

    #[test]
    fn pcm_frames() {
        let record = CachedWaveInfo {
            format: Some(WaveFormatTag::Pcm),
            bits_per_sample: 16,
            channels: 2,
            ..Default::default()
        };

        assert_eq!(record.sample_size(), 4);
    }

    #[test]
    fn block_compressed_bodies_are_byte_streams() {
        for format in [WaveFormatTag::Adpcm, WaveFormatTag::Xma] {
            let record = CachedWaveInfo {
                format: Some(format),
                bits_per_sample: 16,
                channels: 2,
                ..Default::default()
            };

            assert_eq!(record.sample_size(), 1);
        }
    }
}
