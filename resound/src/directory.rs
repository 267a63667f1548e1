use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use resound_loaders::{FileLoader, FileNotFoundError};

/// Serves asset files straight out of a game directory on disk. Normalized
/// cache keys (`sound/ui/click.wav`) resolve relative to the root.
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    /// Creates a loader rooted at the given game directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileLoader for DirectoryLoader {
    fn get(&self, path: &str) -> Result<Vec<u8>, FileNotFoundError> {
        fs::read(self.resolve(path)).map_err(|_error| FileNotFoundError::new(path.to_owned()))
    }

    fn file_size(&self, path: &str) -> Result<u64, FileNotFoundError> {
        fs::metadata(self.resolve(path))
            .map(|metadata| metadata.len())
            .map_err(|_error| FileNotFoundError::new(path.to_owned()))
    }

    fn get_range(&self, path: &str, offset: u64, size: usize) -> Result<Vec<u8>, FileNotFoundError> {
        let mut file = File::open(self.resolve(path)).map_err(|_error| FileNotFoundError::new(path.to_owned()))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|_error| FileNotFoundError::new(path.to_owned()))?;

        let mut data = Vec::with_capacity(size);
        file.take(size as u64)
            .read_to_end(&mut data)
            .map_err(|_error| FileNotFoundError::new(path.to_owned()))?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resound_loaders::FileLoader;

    use super::DirectoryLoader;

    static DIRECTORY_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn game_directory() -> PathBuf {
        let index = DIRECTORY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let directory = std::env::temp_dir().join(format!("resound-directory-{}-{index}", std::process::id()));
        fs::create_dir_all(directory.join("sound")).unwrap();
        directory
    }

    #[test]
    fn reads_files_and_sizes() {
        let directory = game_directory();
        fs::write(directory.join("sound/a.wav"), (0u8..32).collect::<Vec<u8>>()).unwrap();
        let loader = DirectoryLoader::new(&directory);

        assert_eq!(loader.get("sound/a.wav").unwrap().len(), 32);
        assert_eq!(loader.file_size("sound/a.wav").unwrap(), 32);
        assert!(loader.get("sound/b.wav").is_err());
    }

    #[test]
    fn ranged_reads_are_short_at_the_end() {
        let directory = game_directory();
        fs::write(directory.join("sound/a.wav"), (0u8..32).collect::<Vec<u8>>()).unwrap();
        let loader = DirectoryLoader::new(&directory);

        assert_eq!(loader.get_range("sound/a.wav", 8, 8).unwrap(), (8u8..16).collect::<Vec<u8>>());
        assert_eq!(loader.get_range("sound/a.wav", 24, 100).unwrap().len(), 8);
        assert!(loader.get_range("sound/a.wav", 100, 8).unwrap().is_empty());
    }
}
