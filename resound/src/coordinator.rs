use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use hashbrown::HashSet;
use resound_cache::WaveDataCache;
#[cfg(feature = "debug")]
use resound_debug::logging::{Colorize, Timer, print_debug};
use resound_loaders::FileLoader;
use resound_source::{
    AudioSource, DEFAULT_ASYNC_MINIMUM_SIZE, MemorySourceSettings, MemoryWaveSource, StreamingWaveSource,
};
use resound_store::{CachedInfoContainer, CachedWaveInfo, normalize_sound_path};

use crate::builder::{
    PHASE_WEIGHTS, PhaseProgress, ProgressListener, RebuildReport, WaveRecordBuilder, build_full_cache, build_map_cache,
    build_no_data_mirror,
};
use crate::manifest::{MANIFEST_EXTENSION, ManifestAnalyzer, find_map_manifests, parse_manifest};
use crate::{CACHE_DIRECTORY, DEFAULT_BODY_BUDGET, MANIFEST_DIRECTORY};

const SHARED_CACHE_NAME: &str = "_sharedprecache";
const OTHER_CACHE_NAME: &str = "_other";
const OTHER_REBUILD_CACHE_NAME: &str = "_other_rebuild";
const CACHE_FILE_EXTENSION: &str = "cache";

/// Where the coordinator finds its files and how it behaves across levels.
pub struct CoordinatorSettings {
    pub cache_directory: PathBuf,
    pub manifest_directory: PathBuf,
    /// Suffix appended to cache file names for localized sounds, resolved
    /// through [`resolve_language_suffix`](crate::resolve_language_suffix).
    pub language_suffix: String,
    /// When set, every level shutdown writes the runtime precache table back
    /// out as the map's manifest.
    pub reslist_recording: bool,
    pub body_budget: usize,
}

impl CoordinatorSettings {
    /// The default layout below a game directory.
    pub fn for_game_directory(game_directory: &Path) -> Self {
        Self {
            cache_directory: game_directory.join(CACHE_DIRECTORY),
            manifest_directory: game_directory.join(MANIFEST_DIRECTORY),
            language_suffix: String::new(),
            reslist_recording: false,
            body_budget: DEFAULT_BODY_BUDGET,
        }
    }
}

/// The three active cache slots plus the target a running rebuild serves
/// lookups from.
#[derive(Default)]
struct ActiveSlots {
    build_target: Option<CachedInfoContainer>,
    shared: Option<CachedInfoContainer>,
    map: Option<CachedInfoContainer>,
    other: Option<CachedInfoContainer>,
}

/// A client-held reference to a cache record. The handle remembers the flush
/// epoch it was resolved at; once the active cache set changes, the next
/// resolve looks the record up again instead of trusting the stale pointer.
pub struct InfoHandle {
    key: String,
    precached: bool,
    epoch: u64,
    record: Arc<CachedWaveInfo>,
}

impl InfoHandle {
    /// The flush epoch this handle was last resolved at.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The record as of the last resolve, without any epoch check.
    pub fn record(&self) -> &Arc<CachedWaveInfo> {
        &self.record
    }
}

/// Owns the active cache slots, decides which cache answers a lookup,
/// rebuilds the cache files when they are stale and swaps the per-map cache
/// on level change.
pub struct SoundCacheCoordinator {
    loader: Arc<dyn FileLoader>,
    settings: CoordinatorSettings,
    data_cache: WaveDataCache,
    epoch: AtomicU64,
    slots: Mutex<ActiveSlots>,
    async_minimum_size: AtomicU32,
    precache_table: Mutex<HashSet<String>>,
    warned_paths: Mutex<HashSet<String>>,
    current_map: Mutex<Option<String>>,
}

impl SoundCacheCoordinator {
    pub fn new(loader: Arc<dyn FileLoader>, settings: CoordinatorSettings) -> Self {
        let data_cache = WaveDataCache::new(Arc::clone(&loader), settings.body_budget);

        Self {
            loader,
            settings,
            data_cache,
            epoch: AtomicU64::new(0),
            slots: Mutex::new(ActiveSlots::default()),
            async_minimum_size: AtomicU32::new(DEFAULT_ASYNC_MINIMUM_SIZE),
            precache_table: Mutex::new(HashSet::new()),
            warned_paths: Mutex::new(HashSet::new()),
            current_map: Mutex::new(None),
        }
    }

    /// Loads the shared and other caches, rebuilding everything first when
    /// either file is missing or carries a stale version. Returns whether a
    /// rebuild ran.
    pub fn initialize(&self, listener: &dyn ProgressListener) -> io::Result<bool> {
        let shared_path = self.cache_file_path(SHARED_CACHE_NAME);
        let other_path = self.cache_file_path(OTHER_CACHE_NAME);

        if !CachedInfoContainer::file_is_current(&shared_path) || !CachedInfoContainer::file_is_current(&other_path) {
            self.rebuild_caches(false, listener)?;
            return Ok(true);
        }

        let mut slots = self.slots.lock().unwrap();
        self.epoch.fetch_add(1, Ordering::Release);
        slots.shared = Some(CachedInfoContainer::init(&shared_path, Arc::clone(&self.loader)));
        slots.other = Some(CachedInfoContainer::init(&other_path, Arc::clone(&self.loader)));

        Ok(false)
    }

    /// The current flush epoch.
    pub fn flush_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// The asynchronous body cache shared by every wave source.
    pub fn data_cache(&self) -> &WaveDataCache {
        &self.data_cache
    }

    /// Bodies above this size always take the asynchronous path.
    pub fn async_minimum_size(&self) -> u32 {
        self.async_minimum_size.load(Ordering::Relaxed)
    }

    pub fn set_async_minimum_size(&self, size: u32) {
        self.async_minimum_size.store(size, Ordering::Relaxed);
    }

    /// Registers a sound in the runtime precache table, the set written back
    /// out as a manifest when reslist recording is enabled.
    pub fn register_precache(&self, path: &str) {
        self.precache_table.lock().unwrap().insert(normalize_sound_path(path));
    }

    fn cache_file_path(&self, base_name: &str) -> PathBuf {
        self.settings
            .cache_directory
            .join(format!("{base_name}{}.{CACHE_FILE_EXTENSION}", self.settings.language_suffix))
    }

    fn map_cache_path(&self, map_name: &str) -> PathBuf {
        self.cache_file_path(map_name)
    }

    /// Looks up the cache record for an asset. A build in progress answers
    /// from the build target only; otherwise the shared cache wins, then the
    /// per-map cache for precached sounds, then the other cache.
    pub fn get_info(&self, path: &str, is_precached: bool) -> Option<Arc<CachedWaveInfo>> {
        let key = normalize_sound_path(path);
        self.get_info_with_epoch(&key, is_precached).map(|(record, _epoch)| record)
    }

    fn get_info_with_epoch(&self, key: &str, is_precached: bool) -> Option<(Arc<CachedWaveInfo>, u64)> {
        loop {
            let epoch = self.epoch.load(Ordering::Acquire);
            let record = self.lookup_record(key, is_precached);

            // A level change may have swapped the slots underneath the
            // lookup; re-check the epoch and retry on mismatch.
            if self.epoch.load(Ordering::Acquire) == epoch {
                return record.map(|record| (record, epoch));
            }
        }
    }

    fn lookup_record(&self, key: &str, is_precached: bool) -> Option<Arc<CachedWaveInfo>> {
        let mut guard = self.slots.lock().unwrap();
        let slots = &mut *guard;
        let builder = WaveRecordBuilder::new(Arc::clone(&self.loader));

        if let Some(target) = slots.build_target.as_ref() {
            return target.get(key);
        }

        if let Some(shared) = slots.shared.as_mut()
            && shared.entry_exists(key)
        {
            return shared.get_fresh(key, &builder);
        }

        if is_precached {
            return slots.map.as_mut()?.get_fresh(key, &builder);
        }

        slots.other.as_mut()?.get_fresh(key, &builder)
    }

    /// Resolves a record and stamps the result with the current epoch so the
    /// caller can hold on to it across level changes.
    pub fn acquire_info(&self, path: &str, is_precached: bool) -> Option<InfoHandle> {
        let key = normalize_sound_path(path);
        let (record, epoch) = self.get_info_with_epoch(&key, is_precached)?;

        Some(InfoHandle {
            key,
            precached: is_precached,
            epoch,
            record,
        })
    }

    /// Returns the handle's record, looking it up again first when the
    /// active cache set changed since the last resolve.
    pub fn resolve_info(&self, handle: &mut InfoHandle) -> Option<Arc<CachedWaveInfo>> {
        if handle.epoch == self.flush_epoch() {
            return Some(Arc::clone(&handle.record));
        }

        let (record, epoch) = self.get_info_with_epoch(&handle.key, handle.precached)?;
        handle.record = Arc::clone(&record);
        handle.epoch = epoch;

        Some(record)
    }

    /// Creates an in-memory wave source for the asset, or nothing (and a
    /// one-time warning) when no usable record exists.
    pub fn open_memory_source(&self, path: &str, is_precached: bool, play_once: bool) -> Option<Arc<dyn AudioSource>> {
        let record = self.lookup_for_source(path, is_precached)?;

        let settings = MemorySourceSettings {
            play_once,
            async_minimum_size: self.async_minimum_size(),
        };

        Some(Arc::new(MemoryWaveSource::new(
            &normalize_sound_path(path),
            record,
            self.data_cache.clone(),
            settings,
        )))
    }

    /// Creates a streaming wave source for the asset. The mixer reads the
    /// body through the source's stream descriptor.
    pub fn open_streaming_source(&self, path: &str, is_precached: bool) -> Option<Arc<dyn AudioSource>> {
        let record = self.lookup_for_source(path, is_precached)?;

        Some(Arc::new(StreamingWaveSource::new(&normalize_sound_path(path), record)))
    }

    fn lookup_for_source(&self, path: &str, is_precached: bool) -> Option<Arc<CachedWaveInfo>> {
        let key = normalize_sound_path(path);

        match self.get_info(&key, is_precached) {
            Some(record) => Some(record),
            None => {
                if self.warned_paths.lock().unwrap().insert(key) {
                    #[cfg(feature = "debug")]
                    print_debug!("no cached info for sound {}", path.magenta());
                }
                None
            }
        }
    }

    /// Installs the per-map cache for the level and bumps the flush epoch so
    /// every held info handle re-resolves. A map without a cache file leaves
    /// the slot empty.
    pub fn level_init(&self, map_name: &str) {
        let map_path = self.map_cache_path(map_name);
        let container = match map_path.exists() {
            true => Some(CachedInfoContainer::init(&map_path, Arc::clone(&self.loader))),
            false => None,
        };

        // Epoch first, then the pointer, both under the slot lock: readers
        // re-check the epoch after resolving and retry on mismatch.
        let mut slots = self.slots.lock().unwrap();
        self.epoch.fetch_add(1, Ordering::Release);
        if let Some(previous) = slots.map.as_mut() {
            let _ = previous.save();
        }
        slots.map = container;
        drop(slots);

        *self.current_map.lock().unwrap() = Some(map_name.to_owned());
        self.precache_table.lock().unwrap().clear();
    }

    /// Ends the level. With reslist recording enabled the runtime precache
    /// table is written back out as the map's manifest. The per-map cache
    /// stays installed until the next level starts.
    pub fn level_shutdown(&self) -> io::Result<()> {
        if self.settings.reslist_recording {
            let current_map = self.current_map.lock().unwrap().clone();
            if let Some(map_name) = current_map {
                self.write_manifest_file(&map_name)?;
            }
        }

        Ok(())
    }

    /// Writes the current map's precache table as its manifest. Fails when
    /// no level or no per-map cache is active.
    pub fn write_manifest(&self) -> io::Result<PathBuf> {
        let current_map = self.current_map.lock().unwrap().clone();
        let Some(map_name) = current_map else {
            return Err(io::Error::other("no level is active"));
        };

        if self.slots.lock().unwrap().map.is_none() {
            return Err(io::Error::other("no per-map cache is installed"));
        }

        self.write_manifest_file(&map_name)
    }

    fn write_manifest_file(&self, map_name: &str) -> io::Result<PathBuf> {
        let mut paths: Vec<String> = self.precache_table.lock().unwrap().iter().cloned().collect();
        paths.sort();

        let mut contents = String::new();
        for path in &paths {
            contents.push_str(path);
            contents.push('\n');
        }

        let manifest_path = self.settings.manifest_directory.join(format!("{map_name}.{MANIFEST_EXTENSION}"));
        fs::create_dir_all(&self.settings.manifest_directory)?;
        fs::write(&manifest_path, contents)?;

        Ok(manifest_path)
    }

    /// Marks every cached fingerprint and resident body untrustworthy, for
    /// example after a file whitelist change swapped the real files on disk.
    pub fn invalidate_file_info(&self) {
        let mut guard = self.slots.lock().unwrap();
        let slots = &mut *guard;

        for container in [&mut slots.build_target, &mut slots.shared, &mut slots.map, &mut slots.other] {
            if let Some(container) = container {
                container.force_recheck_disk_info();
            }
        }
        drop(guard);

        self.data_cache.invalidate_all();
    }

    /// Rebuilds every cache file from the per-map manifests and the runtime
    /// reference table, then installs the fresh caches. With `force` unset,
    /// per-map caches that are still current are left alone.
    pub fn rebuild_caches(&self, force: bool, listener: &dyn ProgressListener) -> io::Result<RebuildReport> {
        #[cfg(feature = "debug")]
        let timer = Timer::new("rebuild sound caches");

        listener.progress(0.0);

        let mut analyzer = ManifestAnalyzer::new();
        let mut map_manifests: Vec<(String, Vec<String>)> = Vec::new();

        for (map_name, manifest_path) in find_map_manifests(&self.settings.manifest_directory) {
            let text = fs::read_to_string(&manifest_path)?;
            let paths = parse_manifest(&text);
            analyzer.add_map_manifest(paths.iter().map(String::as_str));
            map_manifests.push((map_name, paths));
        }

        for path in self.precache_table.lock().unwrap().iter() {
            analyzer.add_runtime_reference(path);
        }

        let partition = analyzer.partition();
        let shared_paths: Vec<String> = partition
            .shared
            .iter()
            .filter_map(|&key| analyzer.resolve(key))
            .map(str::to_owned)
            .collect();
        let other_paths: Vec<String> = partition
            .other
            .iter()
            .filter_map(|&key| analyzer.resolve(key))
            .map(str::to_owned)
            .collect();

        // The full-data intermediate over the other set. While the rebuild
        // runs, lookups answer from this container only.
        let rebuild_path = self.cache_file_path(OTHER_REBUILD_CACHE_NAME);
        let progress = PhaseProgress::new(listener, 0.0, PHASE_WEIGHTS[0], other_paths.len());
        let mut other_full = build_full_cache(&self.loader, &rebuild_path, &other_paths, false, &progress);
        other_full.save()?;
        self.slots.lock().unwrap().build_target = Some(other_full);

        let progress = PhaseProgress::new(listener, PHASE_WEIGHTS[0], PHASE_WEIGHTS[1], shared_paths.len());
        let mut shared_cache = build_full_cache(
            &self.loader,
            &self.cache_file_path(SHARED_CACHE_NAME),
            &shared_paths,
            true,
            &progress,
        );
        shared_cache.save()?;

        let mut guard = self.slots.lock().unwrap();
        let slots = &mut *guard;
        let other_full = slots.build_target.as_ref().expect("build target was installed above");

        let progress = PhaseProgress::new(listener, PHASE_WEIGHTS[0] + PHASE_WEIGHTS[1], PHASE_WEIGHTS[2], other_full.len());
        let mut other_cache = build_no_data_mirror(
            other_full,
            &self.cache_file_path(OTHER_CACHE_NAME),
            Arc::clone(&self.loader),
            &progress,
        );
        other_cache.save()?;

        let shared_set: HashSet<String> = shared_paths.iter().cloned().collect();
        let progress = PhaseProgress::new(
            listener,
            PHASE_WEIGHTS[0] + PHASE_WEIGHTS[1] + PHASE_WEIGHTS[2],
            PHASE_WEIGHTS[3],
            map_manifests.len(),
        );

        for (index, (map_name, manifest_paths)) in map_manifests.iter().enumerate() {
            progress.step(index);

            let map_path = self.map_cache_path(map_name);
            if !force && CachedInfoContainer::file_is_current(&map_path) {
                continue;
            }

            let mut map_cache = build_map_cache(&map_path, manifest_paths, &shared_set, other_full, Arc::clone(&self.loader));
            map_cache.save()?;
        }
        progress.finish();

        // The intermediate is only needed while building; the final caches
        // take over from here.
        slots.build_target = None;
        drop(guard);
        let _ = fs::remove_file(&rebuild_path);

        // Epoch first, then the pointers, both under the slot lock.
        let mut slots = self.slots.lock().unwrap();
        self.epoch.fetch_add(1, Ordering::Release);
        slots.shared = Some(shared_cache);
        slots.other = Some(other_cache);
        drop(slots);

        listener.progress(1.0);

        #[cfg(feature = "debug")]
        timer.stop();

        Ok(RebuildReport {
            shared_count: shared_paths.len(),
            other_count: other_paths.len(),
            map_count: map_manifests.len(),
        })
    }

    /// Saves every dirty cache and releases the slots.
    pub fn shutdown(&self) -> io::Result<()> {
        let mut guard = self.slots.lock().unwrap();
        let slots = &mut *guard;

        for container in [&mut slots.build_target, &mut slots.shared, &mut slots.map, &mut slots.other] {
            if let Some(mut container) = container.take() {
                container.shutdown()?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resound_formats::test_support::counting_pcm_wave;
    use resound_source::AudioSource;
    use resound_store::CachedInfoContainer;

    use super::{CoordinatorSettings, SoundCacheCoordinator};
    use crate::builder::SilentProgress;
    use crate::directory::DirectoryLoader;

    static DIRECTORY_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn game_fixture() -> (PathBuf, SoundCacheCoordinator) {
        let index = DIRECTORY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let directory = std::env::temp_dir().join(format!("resound-coordinator-{}-{index}", std::process::id()));
        fs::create_dir_all(directory.join("sound")).unwrap();
        fs::create_dir_all(directory.join("maps")).unwrap();

        fs::write(directory.join("sound/x.wav"), counting_pcm_wave(22050, 4410)).unwrap();
        fs::write(directory.join("sound/y.wav"), counting_pcm_wave(22050, 200)).unwrap();
        fs::write(directory.join("sound/z.wav"), counting_pcm_wave(22050, 300)).unwrap();
        fs::write(directory.join("sound/w.wav"), counting_pcm_wave(22050, 400)).unwrap();

        fs::write(directory.join("maps/a.manifest"), "x.wav\ny.wav\n").unwrap();
        fs::write(directory.join("maps/b.manifest"), "x.wav\nz.wav\n").unwrap();
        fs::write(directory.join("maps/c.manifest"), "x.wav\nw.wav\n").unwrap();

        let loader = Arc::new(DirectoryLoader::new(&directory));
        let settings = CoordinatorSettings::for_game_directory(&directory);
        let coordinator = SoundCacheCoordinator::new(loader, settings);

        (directory, coordinator)
    }

    fn load_container(directory: &PathBuf, name: &str) -> CachedInfoContainer {
        let loader = Arc::new(DirectoryLoader::new(directory));
        CachedInfoContainer::init(directory.join("sound/cache").join(name), loader)
    }

    #[test]
    fn rebuild_from_empty_state() {
        let (directory, coordinator) = game_fixture();

        assert!(coordinator.initialize(&SilentProgress).unwrap());

        let cache_directory = directory.join("sound/cache");
        assert!(cache_directory.join("_sharedprecache.cache").exists());
        assert!(cache_directory.join("_other.cache").exists());
        assert!(!cache_directory.join("_other_rebuild.cache").exists());

        // The shared sound is in every map, the rest partition per map.
        let shared = load_container(&directory, "_sharedprecache.cache");
        assert_eq!(shared.keys(), ["sound/x.wav"]);
        assert!(shared.get("sound/x.wav").unwrap().cached_data.is_some());

        let other = load_container(&directory, "_other.cache");
        assert_eq!(other.keys(), ["sound/w.wav", "sound/y.wav", "sound/z.wav"]);
        assert!(other.get("sound/y.wav").unwrap().cached_data.is_none());

        for (map_name, sound) in [("a", "sound/y.wav"), ("b", "sound/z.wav"), ("c", "sound/w.wav")] {
            let map_cache = load_container(&directory, &format!("{map_name}.cache"));
            assert_eq!(map_cache.keys(), [sound]);

            let record = map_cache.get(sound).unwrap();
            assert!(record.precache);
            assert!(record.cached_data.is_some());
        }

        // A second startup finds everything current.
        let loader = Arc::new(DirectoryLoader::new(&directory));
        let second = SoundCacheCoordinator::new(loader, CoordinatorSettings::for_game_directory(&directory));
        assert!(!second.initialize(&SilentProgress).unwrap());
    }

    #[test]
    fn lookup_order_prefers_shared_then_map_then_other() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();
        coordinator.level_init("a");

        // The shared record answers for precached and plain lookups alike.
        assert!(coordinator.get_info("x.wav", true).unwrap().cached_data.is_some());
        assert!(coordinator.get_info("x.wav", false).unwrap().cached_data.is_some());

        // Precached sounds resolve through the per-map cache (full data),
        // everything else through the no-data other cache.
        assert!(coordinator.get_info("y.wav", true).unwrap().cached_data.is_some());
        assert!(coordinator.get_info("y.wav", false).unwrap().cached_data.is_none());

        // A sound precached in a different map is not in this map's cache.
        assert!(coordinator.get_info("z.wav", true).is_none());
        assert!(coordinator.get_info("z.wav", false).is_some());
    }

    #[test]
    fn precached_lookup_requires_an_installed_map_cache() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();

        assert!(coordinator.get_info("y.wav", true).is_none());
        assert!(coordinator.get_info("y.wav", false).is_some());
    }

    #[test]
    fn level_change_bumps_the_epoch_and_handles_reresolve() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();
        coordinator.level_init("a");

        let mut other_handle = coordinator.acquire_info("y.wav", false).unwrap();
        let mut map_handle = coordinator.acquire_info("y.wav", true).unwrap();
        let old_epoch = other_handle.epoch();

        coordinator.level_init("b");
        assert!(coordinator.flush_epoch() > old_epoch);

        // The other-cache record resolves again under the new epoch.
        let record = coordinator.resolve_info(&mut other_handle).unwrap();
        assert_eq!(record.sample_count, 200);
        assert_eq!(other_handle.epoch(), coordinator.flush_epoch());

        // The per-map record is gone: `y` is not precached in map `b`.
        assert!(coordinator.resolve_info(&mut map_handle).is_none());
    }

    #[test]
    fn unchanged_epoch_serves_the_held_record() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();

        let mut handle = coordinator.acquire_info("y.wav", false).unwrap();
        let first = coordinator.resolve_info(&mut handle).unwrap();
        let second = coordinator.resolve_info(&mut handle).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn manifest_writing_persists_the_precache_table() {
        let (directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();

        // Without an active level there is nothing to write.
        assert!(coordinator.write_manifest().is_err());

        coordinator.level_init("a");
        coordinator.register_precache("x.wav");
        coordinator.register_precache("UI\\New.wav");

        let manifest_path = coordinator.write_manifest().unwrap();
        assert_eq!(manifest_path, directory.join("maps/a.manifest"));

        let contents = fs::read_to_string(&manifest_path).unwrap();
        assert_eq!(contents, "sound/ui/new.wav\nsound/x.wav\n");
    }

    #[test]
    fn memory_sources_play_from_cached_records() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();
        coordinator.level_init("a");

        let source = coordinator.open_memory_source("x.wav", true, false).unwrap();
        assert_eq!(source.sample_rate(), 22050);
        assert_eq!(source.sample_count(), 4410);

        // The first kilosample mixes straight out of the lookahead.
        let chunk = source.get_output_data(0, 1000).unwrap();
        assert_eq!(chunk.sample_count(), 1000);
        assert_eq!(&chunk.data()[..4], &[0, 0, 1, 0]);

        // Unknown sounds fail quietly, once per path.
        assert!(coordinator.open_memory_source("missing.wav", false, false).is_none());
        assert!(coordinator.open_memory_source("missing.wav", false, false).is_none());
    }

    #[test]
    fn streaming_sources_expose_the_body_extent() {
        let (_directory, coordinator) = game_fixture();
        coordinator.initialize(&SilentProgress).unwrap();

        let source = coordinator.open_streaming_source("y.wav", false).unwrap();
        assert!(source.is_streaming());
        assert!(source.get_output_data(0, 100).is_none());

        let descriptor = source.stream_descriptor().unwrap();
        assert_eq!(descriptor.file_path, "sound/y.wav");
        assert_eq!(descriptor.data_start, 44);
        assert_eq!(descriptor.data_size, 400);
    }
}
