use resound_bytes::{ByteReader, FromBytes};

use crate::{FormatError, WaveFormatTag};

/// Magic tag of the preprocessed XMA wave container.
pub const XWV_MAGIC: [u8; 4] = *b"XWV ";
/// Current container version.
pub const XWV_VERSION: u32 = 4;
/// Size in bytes of one physical XMA block.
pub const XMA_BLOCK_SIZE: u32 = 2048;

/// Payload encodings an XWV container can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XwvFormat {
    Xma,
    Pcm,
}

impl XwvFormat {
    fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(XwvFormat::Xma),
            1 => Some(XwvFormat::Pcm),
            _ => None,
        }
    }

    /// The wave format tag this payload maps to.
    pub fn wave_format_tag(&self) -> WaveFormatTag {
        match self {
            XwvFormat::Xma => WaveFormatTag::Xma,
            XwvFormat::Pcm => WaveFormatTag::Pcm,
        }
    }
}

/// Fixed header of the preprocessed XMA container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XwvHeader {
    pub format: XwvFormat,
    pub sample_rate: u32,
    pub channels: u32,
    pub data_offset: u32,
    pub data_size: u32,
    pub loop_start: i32,
    pub loop_block: i32,
    pub leading_samples: i32,
    pub trailing_samples: i32,
    pub decoded_samples: u32,
    pub static_data_size: u32,
    pub seek_table_size: u32,
    pub vdat_size: u32,
}

/// A parsed XWV container: header plus the static data that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct XwvFile {
    pub header: XwvHeader,
    pub seek_table: SeekTable,
    pub vdat: Option<Vec<u8>>,
}

/// The XMA seek table. Entry `i` holds the first decoded-sample index of
/// physical block `i + 1`, which makes both directions binary-searchable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeekTable {
    entries: Vec<u32>,
}

impl SeekTable {
    pub fn new(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Maps a decoded sample index to the byte position of the physical
    /// block that has to be submitted to decode it.
    pub fn sample_to_stream_position(&self, sample: u32) -> u64 {
        let packet = self.entries.partition_point(|&entry| entry < sample);
        packet as u64 * XMA_BLOCK_SIZE as u64
    }

    /// Maps a byte position in the stream back to the first decoded sample
    /// of the block starting there. Positions past the table report
    /// `decoded_samples`.
    pub fn stream_to_sample_position(&self, position: u64, decoded_samples: u32) -> u32 {
        let packet = (position / XMA_BLOCK_SIZE as u64) as usize;

        match packet {
            0 => 0,
            packet => self.entries.get(packet - 1).copied().unwrap_or(decoded_samples),
        }
    }
}

/// Parses an XWV container, including the seek table and VDAT blob that
/// trail the fixed header.
pub fn parse_xwv(data: &[u8]) -> Result<XwvFile, FormatError> {
    let mut reader = ByteReader::new(data);

    let magic = reader.bytes::<XwvHeader, 4>().map_err(|_| FormatError::NotRiff)?;
    if magic != XWV_MAGIC {
        return Err(FormatError::UnsupportedFormat("missing XWV magic".to_owned()));
    }

    let version = u32::from_bytes(&mut reader)?;
    if version != XWV_VERSION {
        return Err(FormatError::UnsupportedFormat(format!("XWV version {version}")));
    }

    let format_id = u32::from_bytes(&mut reader)?;
    let format = XwvFormat::from_id(format_id).ok_or_else(|| FormatError::UnsupportedFormat(format!("XWV format {format_id}")))?;

    let header = XwvHeader {
        format,
        sample_rate: u32::from_bytes(&mut reader)?,
        channels: u32::from_bytes(&mut reader)?,
        data_offset: u32::from_bytes(&mut reader)?,
        data_size: u32::from_bytes(&mut reader)?,
        loop_start: i32::from_bytes(&mut reader)?,
        loop_block: i32::from_bytes(&mut reader)?,
        leading_samples: i32::from_bytes(&mut reader)?,
        trailing_samples: i32::from_bytes(&mut reader)?,
        decoded_samples: u32::from_bytes(&mut reader)?,
        static_data_size: u32::from_bytes(&mut reader)?,
        seek_table_size: u32::from_bytes(&mut reader)?,
        vdat_size: u32::from_bytes(&mut reader)?,
    };

    let mut seek_table = SeekTable::default();
    if header.seek_table_size > 0 {
        let table_bytes = reader.slice::<SeekTable>(header.seek_table_size as usize)?;
        let mut table_reader = ByteReader::new(table_bytes);
        let mut entries = Vec::with_capacity(header.seek_table_size as usize / 4);
        while !table_reader.is_empty() {
            entries.push(u32::from_bytes(&mut table_reader)?);
        }
        seek_table = SeekTable::new(entries);
    }

    let vdat = match header.vdat_size {
        0 => None,
        size => Some(reader.slice::<XwvFile>(size as usize)?.to_vec()),
    };

    Ok(XwvFile { header, seek_table, vdat })
}
