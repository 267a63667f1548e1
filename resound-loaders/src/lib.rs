//! Generic file loading functionality.
#![warn(missing_docs)]

/// Error that is thrown when a file loader can't find the requested file.
#[repr(transparent)]
pub struct FileNotFoundError(String);

impl FileNotFoundError {
    /// Create a new [`FileNotFoundError`] with a given path.
    pub fn new(path: String) -> Self {
        Self(path)
    }

    /// Returns the path of the missing file.
    pub fn path(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for FileNotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "can't find file: {}", self.0)
    }
}

/// Trait for general file loading.
pub trait FileLoader: Send + Sync + 'static {
    /// Returns the file content of the requested file.
    fn get(&self, path: &str) -> Result<Vec<u8>, FileNotFoundError>;

    /// Returns the size of the requested file in bytes.
    fn file_size(&self, path: &str) -> Result<u64, FileNotFoundError>;

    /// Returns up to `size` bytes of the requested file, starting at `offset`.
    /// A file shorter than `offset + size` yields a short result, not an
    /// error.
    fn get_range(&self, path: &str, offset: u64, size: usize) -> Result<Vec<u8>, FileNotFoundError> {
        let data = self.get(path)?;
        let start = (offset as usize).min(data.len());
        let end = (start + size).min(data.len());

        Ok(data[start..end].to_vec())
    }
}
