use std::path::{Path, PathBuf};

use hashbrown::{HashMap, HashSet};
use resound_container::{SimpleSlab, create_simple_key};
use resound_store::normalize_sound_path;
use walkdir::WalkDir;

create_simple_key!(SoundPathKey, "The key of an interned sound path");

/// Sounds referenced by at least this share of all maps land in the shared
/// precache cache.
pub const SHARED_PRECACHE_THRESHOLD: f32 = 0.5;

/// File extension of per-map manifest files.
pub const MANIFEST_EXTENSION: &str = "manifest";

/// Interns normalized sound paths behind cheap typed keys so counting and
/// set operations never compare strings.
#[derive(Default)]
pub struct PathInterner {
    paths: SimpleSlab<SoundPathKey, String>,
    lookup: HashMap<String, SoundPathKey>,
}

impl PathInterner {
    /// Returns the key of the normalized path, interning it on first sight.
    pub fn intern(&mut self, path: &str) -> SoundPathKey {
        let normalized = normalize_sound_path(path);

        if let Some(&key) = self.lookup.get(&normalized) {
            return key;
        }

        let key = self.paths.insert(normalized.clone()).expect("path slab is full");
        self.lookup.insert(normalized, key);
        key
    }

    /// The normalized path behind a key.
    pub fn resolve(&self, key: SoundPathKey) -> Option<&str> {
        self.paths.get(key).map(String::as_str)
    }
}

/// The outcome of analyzing every map's manifest: which sounds are common
/// enough to live in the shared cache and which fall through to the other
/// cache. Both sets are ordered by key index, deterministic for
/// deterministic input.
pub struct SoundPartition {
    pub shared: Vec<SoundPathKey>,
    pub other: Vec<SoundPathKey>,
}

/// Counts, across all per-map manifests, how many maps reference each sound
/// and partitions the referenced set against the shared threshold.
#[derive(Default)]
pub struct ManifestAnalyzer {
    interner: PathInterner,
    map_count: u32,
    reference_counts: HashMap<SoundPathKey, u32>,
    runtime_referenced: HashSet<SoundPathKey>,
}

impl ManifestAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one map's manifest. A path referenced several times by the same
    /// map still counts as one map.
    pub fn add_map_manifest<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) {
        self.map_count += 1;

        let mut seen = HashSet::new();
        for path in paths {
            let key = self.interner.intern(path);
            if seen.insert(key) {
                *self.reference_counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    /// Feeds a sound referenced at runtime outside any manifest. Such sounds
    /// always end up in the other set.
    pub fn add_runtime_reference(&mut self, path: &str) {
        let key = self.interner.intern(path);
        self.runtime_referenced.insert(key);
    }

    /// The normalized path behind a key.
    pub fn resolve(&self, key: SoundPathKey) -> Option<&str> {
        self.interner.resolve(key)
    }

    /// Partitions everything referenced so far into the shared and other
    /// sets.
    pub fn partition(&self) -> SoundPartition {
        let mut shared = Vec::new();
        let mut other: Vec<SoundPathKey> = self.runtime_referenced.iter().copied().collect();

        for (&key, &count) in &self.reference_counts {
            let is_shared = self.map_count > 0 && count as f32 / self.map_count as f32 >= SHARED_PRECACHE_THRESHOLD;

            match is_shared {
                true => shared.push(key),
                false if !self.runtime_referenced.contains(&key) => other.push(key),
                false => {}
            }
        }

        other.retain(|key| !shared.contains(key));
        shared.sort();
        other.sort();
        other.dedup();

        SoundPartition { shared, other }
    }
}

/// Parses a manifest file: one relative sound path per line, empty lines and
/// `//` comments skipped.
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .map(str::to_owned)
        .collect()
}

/// Finds every `.manifest` file below the directory, paired with its map
/// name, sorted by name.
pub fn find_map_manifests(directory: &Path) -> Vec<(String, PathBuf)> {
    let mut manifests: Vec<(String, PathBuf)> = WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let extension = path.extension()?;
            let map_name = path.file_stem()?.to_str()?;

            match extension == MANIFEST_EXTENSION {
                true => Some((map_name.to_owned(), path.to_owned())),
                false => None,
            }
        })
        .collect();

    manifests.sort();
    manifests
}
