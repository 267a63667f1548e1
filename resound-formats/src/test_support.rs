//! Helpers for composing synthetic sound containers, used by tests and
//! cache-build tooling across the workspace.

/// Builds a minimal RIFF/WAVE container chunk by chunk, in call order.
pub struct WaveBuilder {
    chunks: Vec<([u8; 4], Vec<u8>)>,
}

impl WaveBuilder {
    /// Starts a container with the given `fmt ` payload.
    pub fn new(format_chunk: Vec<u8>) -> Self {
        Self {
            chunks: vec![(*b"fmt ", format_chunk)],
        }
    }

    /// Appends a `data` chunk.
    pub fn data(self, payload: Vec<u8>) -> Self {
        self.chunk(*b"data", payload)
    }

    /// Appends an arbitrary chunk.
    pub fn chunk(mut self, name: [u8; 4], payload: Vec<u8>) -> Self {
        self.chunks.push((name, payload));
        self
    }

    /// Assembles the container bytes.
    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");

        for (name, data) in &self.chunks {
            body.extend_from_slice(name);
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(data);
            if data.len() % 2 != 0 {
                body.push(0);
            }
        }

        let mut file = Vec::new();
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend_from_slice(&body);
        file
    }
}

/// A plain PCM `fmt ` payload (WAVEFORMATEX without the extension field).
pub fn pcm_format_chunk(bits_per_sample: u16, channels: u16, sample_rate: u32) -> Vec<u8> {
    let block_align = channels * bits_per_sample / 8;
    let average_bytes = sample_rate * block_align as u32;

    let mut chunk = Vec::new();
    chunk.extend_from_slice(&0x0001u16.to_le_bytes());
    chunk.extend_from_slice(&channels.to_le_bytes());
    chunk.extend_from_slice(&sample_rate.to_le_bytes());
    chunk.extend_from_slice(&average_bytes.to_le_bytes());
    chunk.extend_from_slice(&block_align.to_le_bytes());
    chunk.extend_from_slice(&bits_per_sample.to_le_bytes());
    chunk
}

/// An ADPCM `fmt ` payload with the block extension and coefficient table.
pub fn adpcm_format_chunk(channels: u16, sample_rate: u32, samples_per_block: u16, coefficients: &[[i16; 2]]) -> Vec<u8> {
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&0x0002u16.to_le_bytes());
    chunk.extend_from_slice(&channels.to_le_bytes());
    chunk.extend_from_slice(&sample_rate.to_le_bytes());
    chunk.extend_from_slice(&0u32.to_le_bytes());
    chunk.extend_from_slice(&0u16.to_le_bytes());
    chunk.extend_from_slice(&4u16.to_le_bytes());

    let extension_size = 4 + coefficients.len() as u16 * 4;
    chunk.extend_from_slice(&extension_size.to_le_bytes());
    chunk.extend_from_slice(&samples_per_block.to_le_bytes());
    chunk.extend_from_slice(&(coefficients.len() as u16).to_le_bytes());
    for [first, second] in coefficients {
        chunk.extend_from_slice(&first.to_le_bytes());
        chunk.extend_from_slice(&second.to_le_bytes());
    }
    chunk
}

/// Builds a preprocessed XWV container around the given payload.
pub struct XwvBuilder {
    format: crate::XwvFormat,
    sample_rate: u32,
    channels: u32,
    loop_start: i32,
    loop_block: i32,
    leading_samples: i32,
    trailing_samples: i32,
    decoded_samples: u32,
    seek_table: Vec<u32>,
    vdat: Vec<u8>,
    body: Vec<u8>,
}

impl XwvBuilder {
    pub fn new(format: crate::XwvFormat, sample_rate: u32, channels: u32) -> Self {
        Self {
            format,
            sample_rate,
            channels,
            loop_start: -1,
            loop_block: 0,
            leading_samples: 0,
            trailing_samples: 0,
            decoded_samples: 0,
            seek_table: Vec::new(),
            vdat: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn loop_region(mut self, loop_start: i32, loop_block: i32) -> Self {
        self.loop_start = loop_start;
        self.loop_block = loop_block;
        self
    }

    pub fn decoded_samples(mut self, decoded_samples: u32) -> Self {
        self.decoded_samples = decoded_samples;
        self
    }

    pub fn seek_table(mut self, entries: Vec<u32>) -> Self {
        self.seek_table = entries;
        self
    }

    pub fn vdat(mut self, vdat: Vec<u8>) -> Self {
        self.vdat = vdat;
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Vec<u8> {
        const HEADER_SIZE: u32 = 60;

        let seek_table_size = self.seek_table.len() as u32 * 4;
        let vdat_size = self.vdat.len() as u32;
        let data_offset = HEADER_SIZE + seek_table_size + vdat_size;

        let format_id: u32 = match self.format {
            crate::XwvFormat::Xma => 0,
            crate::XwvFormat::Pcm => 1,
        };

        let mut file = Vec::new();
        file.extend_from_slice(&crate::XWV_MAGIC);
        file.extend_from_slice(&crate::XWV_VERSION.to_le_bytes());
        file.extend_from_slice(&format_id.to_le_bytes());
        file.extend_from_slice(&self.sample_rate.to_le_bytes());
        file.extend_from_slice(&self.channels.to_le_bytes());
        file.extend_from_slice(&data_offset.to_le_bytes());
        file.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        file.extend_from_slice(&self.loop_start.to_le_bytes());
        file.extend_from_slice(&self.loop_block.to_le_bytes());
        file.extend_from_slice(&self.leading_samples.to_le_bytes());
        file.extend_from_slice(&self.trailing_samples.to_le_bytes());
        file.extend_from_slice(&self.decoded_samples.to_le_bytes());
        file.extend_from_slice(&(seek_table_size + vdat_size).to_le_bytes());
        file.extend_from_slice(&seek_table_size.to_le_bytes());
        file.extend_from_slice(&vdat_size.to_le_bytes());

        for entry in &self.seek_table {
            file.extend_from_slice(&entry.to_le_bytes());
        }
        file.extend_from_slice(&self.vdat);
        file.extend_from_slice(&self.body);
        file
    }
}

/// A 16-bit mono PCM wave whose samples count up from zero, handy for
/// asserting sample-accurate reads.
pub fn counting_pcm_wave(sample_rate: u32, sample_count: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(sample_count * 2);
    for sample in 0..sample_count {
        payload.extend_from_slice(&(sample as i16).to_le_bytes());
    }

    WaveBuilder::new(pcm_format_chunk(16, 1, sample_rate)).data(payload).build()
}
