use resound_formats::{FormatError, WaveFormatTag, XWV_MAGIC, XwvFormat, parse_wave, parse_xwv};
use resound_loaders::{FileLoader, FileNotFoundError};
use resound_store::{CachedWaveInfo, LOOKAHEAD_SECONDS, MAX_CACHED_DATA_SIZE, SourceKind};

/// Error cases of the describe pass.
#[derive(Debug)]
pub enum DescribeError {
    File(FileNotFoundError),
    Format(FormatError),
}

impl From<FileNotFoundError> for DescribeError {
    fn from(error: FileNotFoundError) -> Self {
        DescribeError::File(error)
    }
}

impl From<FormatError> for DescribeError {
    fn from(error: FormatError) -> Self {
        DescribeError::Format(error)
    }
}

/// Sizes the always-resident lookahead prefix: enough bytes for the tuned
/// duration, rounded up to a four byte boundary and clamped to the body and
/// the record limit.
fn lookahead_size(sample_rate: u32, sample_size: u32, data_size: u32) -> u32 {
    let samples = (LOOKAHEAD_SECONDS * sample_rate as f32).ceil() as u32;
    let bytes = (samples * sample_size + 3) & !3;

    bytes.min(data_size).min(MAX_CACHED_DATA_SIZE as u32)
}

fn capture_lookahead(file: &[u8], data_start: u32, data_size: u32, size: u32, unsigned_samples: bool) -> Option<Vec<u8>> {
    if size == 0 {
        return None;
    }

    let start = data_start as usize;
    let end = (start + size as usize).min(start + data_size as usize).min(file.len());
    if start >= end {
        return None;
    }

    let mut bytes = file[start..end].to_vec();
    if unsigned_samples {
        // Stored ready to mix: the container keeps 8-bit PCM unsigned, the
        // mixer consumes signed.
        for byte in &mut bytes {
            *byte = byte.wrapping_sub(128);
        }
    }

    Some(bytes)
}

fn describe_wave(file: &[u8]) -> Result<CachedWaveInfo, DescribeError> {
    let parsed = parse_wave(file)?;

    let sample_size = parsed.format.sample_size();
    let sample_count = parsed.data_size / sample_size;
    let decoded_sample_count = parsed.sample_count();

    let lookahead = lookahead_size(parsed.format.sample_rate, sample_size, parsed.data_size);
    let unsigned_samples = parsed.format.tag == WaveFormatTag::Pcm && parsed.format.bits_per_sample == 8;
    let cached_data = capture_lookahead(file, parsed.data_start, parsed.data_size, lookahead, unsigned_samples);

    Ok(CachedWaveInfo {
        format: Some(parsed.format.tag),
        sample_rate: parsed.format.sample_rate,
        bits_per_sample: parsed.format.bits_per_sample,
        channels: parsed.format.channels,
        kind: SourceKind::Wave,
        precache: false,
        data_start: parsed.data_start,
        data_size: parsed.data_size,
        loop_start: parsed.loop_start,
        sample_count,
        decoded_sample_count,
        loop_block: 0,
        leading_samples: 0,
        trailing_samples: 0,
        sentence: parsed.sentence_bytes,
        cached_data,
        header: parsed.header_bytes,
    })
}

fn describe_xwv(file: &[u8]) -> Result<CachedWaveInfo, DescribeError> {
    let parsed = parse_xwv(file)?;
    let header = &parsed.header;

    if header.data_offset as usize + header.data_size as usize > file.len() {
        return Err(DescribeError::Format(FormatError::UnsupportedFormat("truncated XWV body".to_owned())));
    }

    let tag = header.format.wave_format_tag();
    let channels = header.channels as u16;

    let (sample_count, decoded_sample_count, header_bytes, cached_data) = match header.format {
        XwvFormat::Xma => {
            let seek_table_bytes: Vec<u8> = parsed
                .seek_table
                .entries()
                .iter()
                .flat_map(|entry| entry.to_le_bytes())
                .collect();
            let header_bytes = match seek_table_bytes.is_empty() {
                true => None,
                false => Some(seek_table_bytes),
            };

            (header.data_size, header.decoded_samples, header_bytes, None)
        }
        XwvFormat::Pcm => {
            let sample_size = 2 * channels as u32;
            let sample_count = header.data_size / sample_size;
            let lookahead = lookahead_size(header.sample_rate, sample_size, header.data_size);
            let cached_data = capture_lookahead(file, header.data_offset, header.data_size, lookahead, false);

            (sample_count, sample_count, None, cached_data)
        }
    };

    Ok(CachedWaveInfo {
        format: Some(tag),
        sample_rate: header.sample_rate,
        bits_per_sample: 16,
        channels,
        kind: SourceKind::Wave,
        precache: false,
        data_start: header.data_offset,
        data_size: header.data_size,
        loop_start: header.loop_start,
        sample_count,
        decoded_sample_count,
        loop_block: header.loop_block,
        leading_samples: header.leading_samples,
        trailing_samples: header.trailing_samples,
        sentence: parsed.vdat,
        cached_data,
        header: header_bytes,
    })
}

/// "Describe yourself" mode: parses the asset container and produces the
/// complete cache record, lookahead body and sentence included, without
/// constructing a playable source. The cache build pipeline drives this for
/// every referenced asset.
pub fn describe(path: &str, loader: &dyn FileLoader) -> Result<CachedWaveInfo, DescribeError> {
    let file = loader.get(path)?;

    match file.starts_with(&XWV_MAGIC) {
        true => describe_xwv(&file),
        false => describe_wave(&file),
    }
}
