use resound_bytes::{ByteReader, ConversionResult, FromBytes};

use crate::{FormatError, RiffWalker};

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_ADPCM: u16 = 0x0002;

/// The sample encodings served by the wave pipeline. ADPCM and XMA bodies are
/// handed to the mixer as byte streams that its decoder consumes block-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveFormatTag {
    Pcm,
    Adpcm,
    Xma,
}

impl WaveFormatTag {
    /// Stable id used inside persisted cache records. Zero is reserved for
    /// records that need a rebuild.
    pub fn id(&self) -> u32 {
        match self {
            WaveFormatTag::Pcm => 1,
            WaveFormatTag::Adpcm => 2,
            WaveFormatTag::Xma => 3,
        }
    }

    /// Inverse of [`id`](Self::id).
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(WaveFormatTag::Pcm),
            2 => Some(WaveFormatTag::Adpcm),
            3 => Some(WaveFormatTag::Xma),
            _ => None,
        }
    }
}

/// The decoded `fmt ` descriptor of a wave asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub tag: WaveFormatTag,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Bytes per sample frame. Block-compressed formats report one byte so
    /// the mixer can treat the body as a plain byte stream.
    pub fn sample_size(&self) -> u32 {
        match self.tag {
            WaveFormatTag::Pcm => {
                let size = (self.bits_per_sample as u32 * self.channels as u32) / 8;
                size.max(1)
            }
            WaveFormatTag::Adpcm | WaveFormatTag::Xma => 1,
        }
    }
}

/// The ADPCM extension of a `fmt ` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdpcmFormat {
    pub samples_per_block: u16,
    pub coefficients: Vec<[i16; 2]>,
}

/// Computes the true decoded sample count of an ADPCM body from its block
/// layout. Each block carries a 7-byte-per-channel header followed by packed
/// nibbles; a trailing partial block decodes proportionally fewer samples.
pub fn adpcm_sample_count(data_size: u32, channels: u16, samples_per_block: u16) -> u32 {
    let channels = channels as u32;
    let samples_per_block = samples_per_block as u32;

    let block_size = ((samples_per_block - 2) * channels) / 2 + 7 * channels;
    if block_size == 0 {
        return 0;
    }

    let block_count = data_size / block_size;
    let block_rem = data_size % block_size;

    let mut sample_count = block_count * samples_per_block;
    if block_rem > 0 {
        sample_count += samples_per_block - ((block_size - block_rem) * 2) / channels;
    }

    sample_count
}

/// Everything the cache needs to know about a RIFF/WAVE container, extracted
/// in a single pass over its chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWave {
    pub format: WaveFormat,
    pub adpcm: Option<AdpcmFormat>,
    /// Raw `fmt ` payload, kept for ADPCM so the mixer's decoder sees the
    /// coefficient table.
    pub header_bytes: Option<Vec<u8>>,
    pub data_start: u32,
    pub data_size: u32,
    /// Starting sample of the loop region, `-1` when the asset does not loop.
    pub loop_start: i32,
    /// Raw `VDAT` payload carrying the phoneme sentence, if present.
    pub sentence_bytes: Option<Vec<u8>>,
}

impl ParsedWave {
    /// True decoded sample count of the body.
    pub fn sample_count(&self) -> u32 {
        match (&self.format.tag, &self.adpcm) {
            (WaveFormatTag::Adpcm, Some(adpcm)) => {
                adpcm_sample_count(self.data_size, self.format.channels, adpcm.samples_per_block)
            }
            _ => self.data_size / self.format.sample_size(),
        }
    }
}

fn parse_format_chunk(data: &[u8]) -> Result<(WaveFormat, Option<AdpcmFormat>), FormatError> {
    let mut reader = ByteReader::new(data);

    let format_tag = u16::from_bytes(&mut reader)?;
    let channels = u16::from_bytes(&mut reader)?;
    let sample_rate = u32::from_bytes(&mut reader)?;
    let _average_bytes_per_second = u32::from_bytes(&mut reader)?;
    let _block_align = u16::from_bytes(&mut reader)?;
    let bits_per_sample = u16::from_bytes(&mut reader)?;

    let tag = match format_tag {
        WAVE_FORMAT_PCM => WaveFormatTag::Pcm,
        WAVE_FORMAT_ADPCM => WaveFormatTag::Adpcm,
        other => return Err(FormatError::UnsupportedFormat(format!("format tag {other:#06x}"))),
    };

    if tag == WaveFormatTag::Pcm && bits_per_sample > 16 {
        return Err(FormatError::UnsupportedBits(bits_per_sample));
    }

    let adpcm = match tag {
        WaveFormatTag::Adpcm => Some(parse_adpcm_extension(&mut reader)?),
        _ => None,
    };

    let format = WaveFormat {
        tag,
        channels,
        sample_rate,
        bits_per_sample,
    };

    Ok((format, adpcm))
}

fn parse_adpcm_extension(reader: &mut ByteReader) -> ConversionResult<AdpcmFormat> {
    let _extension_size = u16::from_bytes(reader)?;
    let samples_per_block = u16::from_bytes(reader)?;
    let coefficient_count = u16::from_bytes(reader)?;

    let mut coefficients = Vec::with_capacity(coefficient_count as usize);
    for _ in 0..coefficient_count {
        let first = i16::from_bytes(reader)?;
        let second = i16::from_bytes(reader)?;
        coefficients.push([first, second]);
    }

    Ok(AdpcmFormat {
        samples_per_block,
        coefficients,
    })
}

/// Extracts the loop start from a `cue ` chunk: the `dwSampleOffset` of the
/// first cue point.
fn parse_cue_chunk(data: &[u8]) -> Option<i32> {
    let mut reader = ByteReader::new(data);

    let cue_point_count = u32::from_bytes(&mut reader).ok()?;
    if cue_point_count == 0 {
        return None;
    }

    let _name = u32::from_bytes(&mut reader).ok()?;
    let _position = u32::from_bytes(&mut reader).ok()?;
    let _chunk_id = u32::from_bytes(&mut reader).ok()?;
    let _chunk_start = u32::from_bytes(&mut reader).ok()?;
    let _block_start = u32::from_bytes(&mut reader).ok()?;
    let sample_offset = u32::from_bytes(&mut reader).ok()?;

    Some(sample_offset as i32)
}

/// Extracts the loop start from a `smpl` chunk: the start of the first
/// forward (type 0) sample loop.
fn parse_smpl_chunk(data: &[u8]) -> Option<i32> {
    let mut reader = ByteReader::new(data);

    // Manufacturer through sampler data: nine 32-bit fields precede the loop
    // table, the eighth being the loop count.
    reader.skip::<u32>(4 * 7).ok()?;
    let loop_count = u32::from_bytes(&mut reader).ok()?;
    let _sampler_data = u32::from_bytes(&mut reader).ok()?;

    if loop_count == 0 {
        return None;
    }

    let _identifier = u32::from_bytes(&mut reader).ok()?;
    let loop_type = u32::from_bytes(&mut reader).ok()?;
    let loop_start = u32::from_bytes(&mut reader).ok()?;

    match loop_type {
        0 => Some(loop_start as i32),
        _ => None,
    }
}

/// Parses a RIFF/WAVE container into the descriptor the cache records.
pub fn parse_wave(data: &[u8]) -> Result<ParsedWave, FormatError> {
    let mut walker = RiffWalker::open(data)?;

    let mut format = None;
    let mut data_extent = None;
    let mut loop_start = -1;
    let mut sentence_bytes = None;

    loop {
        match walker.chunk_name() {
            Some(name) => match &name {
                b"fmt " => {
                    let chunk = walker.chunk_data().ok_or(FormatError::MissingChunk("fmt "))?;
                    let (parsed_format, adpcm) = parse_format_chunk(chunk)?;
                    let header_bytes = match parsed_format.tag {
                        WaveFormatTag::Adpcm => Some(chunk.to_vec()),
                        _ => None,
                    };
                    format = Some((parsed_format, adpcm, header_bytes));
                }
                b"data" => {
                    data_extent = Some((walker.chunk_position() as u32, walker.chunk_size() as u32));
                }
                b"cue " => {
                    if let Some(chunk) = walker.chunk_data()
                        && let Some(sample) = parse_cue_chunk(chunk)
                    {
                        loop_start = sample;
                    }
                }
                b"smpl" => {
                    if let Some(chunk) = walker.chunk_data()
                        && loop_start < 0
                        && let Some(sample) = parse_smpl_chunk(chunk)
                    {
                        loop_start = sample;
                    }
                }
                b"VDAT" => {
                    sentence_bytes = walker.chunk_data().map(|chunk| chunk.to_vec());
                }
                _ => {}
            },
            None => break,
        }

        if !walker.next() {
            break;
        }
    }

    let (format, adpcm, header_bytes) = format.ok_or(FormatError::MissingChunk("fmt "))?;
    let (data_start, data_size) = data_extent.ok_or(FormatError::MissingChunk("data"))?;

    Ok(ParsedWave {
        format,
        adpcm,
        header_bytes,
        data_start,
        data_size,
        loop_start,
        sentence_bytes,
    })
}

#[cfg(test)]
mod adpcm {
    use super::adpcm_sample_count;

    #[test]
    fn block_layout() {
        // samples_per_block 1012 at two channels gives 1024-byte blocks.
        // Nine full blocks plus a 54-byte tail decode to 9150 samples.
        assert_eq!(adpcm_sample_count(9 * 1024 + 54, 2, 1012), 9 * 1012 + 42);
    }

    #[test]
    fn exact_blocks() {
        assert_eq!(adpcm_sample_count(9 * 1024, 2, 1012), 9 * 1012);
    }

    #[test]
    fn partial_tail() {
        assert_eq!(adpcm_sample_count(10230, 2, 1012), 9 * 1012 + 1002);
    }
}
