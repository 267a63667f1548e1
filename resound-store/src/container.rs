use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use resound_bytes::{ByteReader, ByteWriter, FromBytes, FromBytesExt, ToBytes};
#[cfg(feature = "debug")]
use resound_debug::logging::{Colorize, print_debug};
use resound_loaders::FileLoader;

use crate::{CachedWaveInfo, LOOKAHEAD_SECONDS, MAX_CACHED_DATA_SIZE, MAX_HEADER_SIZE};

const CONTAINER_MAGIC: u32 = u32::from_le_bytes(*b"RSND");
const CONTAINER_VERSION: u32 = 2;

/// Checksum over the runtime constants that shape record contents. Bumping a
/// tuning constant invalidates every persisted cache file at once.
pub fn container_metadata_checksum() -> u32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&LOOKAHEAD_SECONDS.to_le_bytes());
    hasher.update(&(MAX_CACHED_DATA_SIZE as u32).to_le_bytes());
    hasher.update(&(MAX_HEADER_SIZE as u32).to_le_bytes());

    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Rebuilds one record from the asset on disk. Implemented by the wave
/// source layer and injected here, so the container never parses sound files
/// itself.
pub trait RecordBuilder: Send + Sync {
    /// Produces a fresh record for the normalized asset path, or `None` when
    /// the asset is unreadable.
    fn build_record(&self, path: &str) -> Option<CachedWaveInfo>;
}

struct ContainerEntry {
    fingerprint: u32,
    checked_disk: bool,
    record: Arc<CachedWaveInfo>,
}

/// A keyed, versioned table of [`CachedWaveInfo`] records persisted as a
/// single `.cache` file.
pub struct CachedInfoContainer {
    file_path: PathBuf,
    loader: Arc<dyn FileLoader>,
    entries: HashMap<String, ContainerEntry>,
    dirty: bool,
}

impl CachedInfoContainer {
    /// Loads the container from disk. A file with a foreign version or
    /// metadata checksum is deleted and the container starts out empty.
    pub fn init(file_path: impl Into<PathBuf>, loader: Arc<dyn FileLoader>) -> Self {
        let file_path = file_path.into();

        let mut container = Self {
            file_path,
            loader,
            entries: HashMap::new(),
            dirty: false,
        };

        match fs::read(&container.file_path) {
            Ok(bytes) => {
                if !container.load_from(&bytes) {
                    #[cfg(feature = "debug")]
                    print_debug!("removing stale sound cache {}", container.file_path.display().yellow());
                    let _ = fs::remove_file(&container.file_path);
                    container.entries.clear();
                }
            }
            Err(_) => {}
        }

        container
    }

    fn load_from(&mut self, bytes: &[u8]) -> bool {
        let mut reader = ByteReader::new(bytes);

        let Ok(magic) = u32::from_bytes(&mut reader) else {
            return false;
        };
        let Ok(version) = u32::from_bytes(&mut reader) else {
            return false;
        };
        let Ok(checksum) = u32::from_bytes(&mut reader) else {
            return false;
        };

        if magic != CONTAINER_MAGIC || version != CONTAINER_VERSION || checksum != container_metadata_checksum() {
            return false;
        }

        let Ok(entry_count) = u32::from_bytes(&mut reader) else {
            return false;
        };

        for _ in 0..entry_count {
            let Ok(key_length) = u16::from_bytes(&mut reader) else {
                return false;
            };
            let Ok(key) = String::from_n_bytes(&mut reader, key_length as usize) else {
                return false;
            };
            let Ok(fingerprint) = u32::from_bytes(&mut reader) else {
                return false;
            };
            let Ok(record_length) = u32::from_bytes(&mut reader) else {
                return false;
            };
            let Ok(record) = CachedWaveInfo::from_n_bytes(&mut reader, record_length as usize) else {
                return false;
            };

            self.entries.insert(key, ContainerEntry {
                fingerprint,
                checked_disk: false,
                record: Arc::new(record),
            });
        }

        true
    }

    /// Checks whether an on-disk container file carries the current version
    /// and metadata checksum, without loading its entries. A missing file is
    /// not current.
    pub fn file_is_current(file_path: &Path) -> bool {
        let Ok(bytes) = fs::read(file_path) else {
            return false;
        };

        let mut reader = ByteReader::new(&bytes);
        let Ok(magic) = u32::from_bytes(&mut reader) else {
            return false;
        };
        let Ok(version) = u32::from_bytes(&mut reader) else {
            return false;
        };
        let Ok(checksum) = u32::from_bytes(&mut reader) else {
            return false;
        };

        magic == CONTAINER_MAGIC && version == CONTAINER_VERSION && checksum == container_metadata_checksum()
    }

    /// Returns whether a record exists for the key, without any freshness
    /// check.
    pub fn entry_exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the record for the key, without any freshness check.
    pub fn get(&self, key: &str) -> Option<Arc<CachedWaveInfo>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry.record))
    }

    /// Returns the record for the key, transparently rebuilding it when the
    /// on-disk asset no longer matches the stored fingerprint or the record
    /// was marked stale.
    pub fn get_fresh(&mut self, key: &str, builder: &dyn RecordBuilder) -> Option<Arc<CachedWaveInfo>> {
        let needs_rebuild = {
            let entry = self.entries.get(key)?;

            match entry.checked_disk {
                true => entry.record.needs_rebuild(),
                false => {
                    let on_disk = self.loader.file_size(key).map(|size| size as u32).unwrap_or(0);
                    entry.record.needs_rebuild() || on_disk != entry.fingerprint
                }
            }
        };

        if needs_rebuild {
            self.rebuild_item(key, builder)?;
        }

        let entry = self.entries.get_mut(key)?;
        entry.checked_disk = true;
        Some(Arc::clone(&entry.record))
    }

    /// Rebuilds a single record in place by asking the wave source layer to
    /// describe the asset again.
    pub fn rebuild_item(&mut self, key: &str, builder: &dyn RecordBuilder) -> Option<Arc<CachedWaveInfo>> {
        let record = builder.build_record(key)?;
        let fingerprint = self.loader.file_size(key).map(|size| size as u32).unwrap_or(0);

        let record = Arc::new(record);
        self.entries.insert(key.to_owned(), ContainerEntry {
            fingerprint,
            checked_disk: true,
            record: Arc::clone(&record),
        });
        self.dirty = true;

        Some(record)
    }

    /// Stores a record under the key. Used while (re)building cache files.
    pub fn set_element(&mut self, key: &str, fingerprint: u32, record: Arc<CachedWaveInfo>) {
        self.entries.insert(key.to_owned(), ContainerEntry {
            fingerprint,
            checked_disk: true,
            record,
        });
        self.dirty = true;
    }

    /// Fingerprint stored for the key, if any.
    pub fn fingerprint(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(|entry| entry.fingerprint)
    }

    /// Marks every entry as needing a fresh disk comparison, used after a
    /// file whitelist change could have swapped the real file underneath.
    pub fn force_recheck_disk_info(&mut self) {
        for entry in self.entries.values_mut() {
            entry.checked_disk = false;
        }
    }

    /// Number of records in the container.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the container holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys in deterministic order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The file this container persists to.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Writes the container if it changed since loading or no file exists
    /// yet. The write is atomic: a temporary sibling is written first and
    /// renamed over the target.
    pub fn save(&mut self) -> std::io::Result<()> {
        if !self.dirty && self.file_path.exists() {
            return Ok(());
        }

        let mut writer = ByteWriter::new();
        let _ = CONTAINER_MAGIC.to_bytes(&mut writer);
        let _ = CONTAINER_VERSION.to_bytes(&mut writer);
        let _ = container_metadata_checksum().to_bytes(&mut writer);
        let _ = (self.entries.len() as u32).to_bytes(&mut writer);

        for key in self.keys() {
            let entry = &self.entries[&key];

            let mut record_writer = ByteWriter::new();
            entry
                .record
                .to_bytes(&mut record_writer)
                .map_err(|error| std::io::Error::other(format!("{error:?}")))?;

            let _ = (key.len() as u16).to_bytes(&mut writer);
            writer.extend_from_slice(key.as_bytes());
            let _ = entry.fingerprint.to_bytes(&mut writer);
            let _ = (record_writer.len() as u32).to_bytes(&mut writer);
            writer.extend_from_slice(record_writer.as_slice());
        }

        let temporary_path = self.file_path.with_extension("cache.tmp");
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&temporary_path, writer.as_slice())?;
        fs::rename(&temporary_path, &self.file_path)?;

        self.dirty = false;
        Ok(())
    }

    /// Saves pending changes and releases the records.
    pub fn shutdown(&mut self) -> std::io::Result<()> {
        let result = self.save();
        self.entries.clear();
        result
    }
}
