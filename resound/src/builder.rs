use std::fs;
use std::path::Path;
use std::sync::Arc;

use hashbrown::HashSet;
#[cfg(feature = "debug")]
use resound_debug::logging::{Colorize, print_debug};
use resound_loaders::FileLoader;
use resound_source::describe;
use resound_store::{CachedInfoContainer, CachedWaveInfo, RecordBuilder, normalize_sound_path};

/// A progress fraction is emitted after this many records.
pub(crate) const PROGRESS_STRIDE: usize = 100;

/// How much of the rebuild each phase contributes to the reported progress:
/// full-data other, full-data shared, no-data other, per-map caches.
pub(crate) const PHASE_WEIGHTS: [f32; 4] = [0.33, 0.42, 0.15, 0.10];

/// Receives progress fractions in `[0, 1]` while the cache files rebuild.
pub trait ProgressListener: Send + Sync {
    fn progress(&self, fraction: f32);
}

/// A listener that swallows all progress reports.
pub struct SilentProgress;

impl ProgressListener for SilentProgress {
    fn progress(&self, _fraction: f32) {}
}

/// Counts of a finished rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub shared_count: usize,
    pub other_count: usize,
    pub map_count: usize,
}

/// Maps record indices of one rebuild phase onto its slice of the overall
/// progress range.
pub(crate) struct PhaseProgress<'a> {
    listener: &'a dyn ProgressListener,
    base: f32,
    weight: f32,
    total: usize,
}

impl<'a> PhaseProgress<'a> {
    pub(crate) fn new(listener: &'a dyn ProgressListener, base: f32, weight: f32, total: usize) -> Self {
        Self {
            listener,
            base,
            weight,
            total,
        }
    }

    pub(crate) fn step(&self, index: usize) {
        if self.total > 0 && index % PROGRESS_STRIDE == 0 {
            self.listener.progress(self.base + self.weight * index as f32 / self.total as f32);
        }
    }

    pub(crate) fn finish(&self) {
        self.listener.progress(self.base + self.weight);
    }
}

/// Rebuilds single records by re-describing the asset on disk. Injected into
/// the containers for transparent stale-entry recovery.
pub(crate) struct WaveRecordBuilder {
    loader: Arc<dyn FileLoader>,
}

impl WaveRecordBuilder {
    pub(crate) fn new(loader: Arc<dyn FileLoader>) -> Self {
        Self { loader }
    }
}

impl RecordBuilder for WaveRecordBuilder {
    fn build_record(&self, path: &str) -> Option<CachedWaveInfo> {
        describe(path, self.loader.as_ref()).ok()
    }
}

/// Builds a full-data cache over the given normalized paths: every record
/// carries its lookahead body, format header and sentence. Unreadable assets
/// are skipped.
pub(crate) fn build_full_cache(
    loader: &Arc<dyn FileLoader>,
    file_path: &Path,
    paths: &[String],
    precache: bool,
    progress: &PhaseProgress<'_>,
) -> CachedInfoContainer {
    let _ = fs::remove_file(file_path);
    let mut container = CachedInfoContainer::init(file_path, Arc::clone(loader));

    for (index, path) in paths.iter().enumerate() {
        progress.step(index);

        let Ok(mut record) = describe(path, loader.as_ref()) else {
            #[cfg(feature = "debug")]
            print_debug!("skipping unreadable sound {}", path.magenta());
            continue;
        };

        record.precache = precache;
        let fingerprint = loader.file_size(path).map(|size| size as u32).unwrap_or(0);
        container.set_element(path, fingerprint, Arc::new(record));
    }

    progress.finish();
    container
}

/// Builds the no-data mirror of a full-data cache: lookahead bodies are
/// dropped, all other metadata and the file fingerprints stay.
pub(crate) fn build_no_data_mirror(
    source: &CachedInfoContainer,
    file_path: &Path,
    loader: Arc<dyn FileLoader>,
    progress: &PhaseProgress<'_>,
) -> CachedInfoContainer {
    let _ = fs::remove_file(file_path);
    let mut mirror = CachedInfoContainer::init(file_path, loader);

    for (index, key) in source.keys().iter().enumerate() {
        progress.step(index);

        let Some(record) = source.get(key) else {
            continue;
        };

        let mut record = (*record).clone();
        record.cached_data = None;
        record.precache = false;
        mirror.set_element(key, source.fingerprint(key).unwrap_or(0), Arc::new(record));
    }

    progress.finish();
    mirror
}

/// Builds one per-map cache from its manifest: sounds already in the shared
/// set are skipped, everything else copies its full-data record and file
/// fingerprint from the intermediate other cache.
pub(crate) fn build_map_cache(
    file_path: &Path,
    manifest_paths: &[String],
    shared: &HashSet<String>,
    full_other: &CachedInfoContainer,
    loader: Arc<dyn FileLoader>,
) -> CachedInfoContainer {
    let _ = fs::remove_file(file_path);
    let mut container = CachedInfoContainer::init(file_path, loader);

    for path in manifest_paths {
        let key = normalize_sound_path(path);

        if shared.contains(&key) {
            continue;
        }

        let Some(record) = full_other.get(&key) else {
            continue;
        };

        let mut record = (*record).clone();
        record.precache = true;
        container.set_element(&key, full_other.fingerprint(&key).unwrap_or(0), Arc::new(record));
    }

    container
}
