use resound_bytes::ConversionError;

/// Error cases encountered while parsing a sound container.
#[derive(Debug)]
pub enum FormatError {
    /// The data does not start with a RIFF/WAVE header.
    NotRiff,
    /// The container declares a sample width the mixer can't consume.
    UnsupportedBits(u16),
    /// The container is structurally valid but uses an unknown layout.
    UnsupportedFormat(String),
    /// A required chunk is missing from the container.
    MissingChunk(&'static str),
    /// A field could not be deserialized.
    Conversion(Box<ConversionError>),
}

impl From<Box<ConversionError>> for FormatError {
    fn from(error: Box<ConversionError>) -> Self {
        FormatError::Conversion(error)
    }
}
