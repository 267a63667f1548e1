//! Asynchronous cache for wave sample bodies.
//!
//! Bodies are fetched off disk on the rayon thread pool and held under a
//! byte budget. The mixer-facing path never blocks: it either receives a
//! pointer to an already resident body or kicks off a load and reports that
//! nothing is available yet.

use std::sync::{Arc, Condvar, Mutex};

use hashbrown::HashMap;
use rayon::spawn;
use resound_container::{GenerationalSlab, create_generational_key};
#[cfg(feature = "debug")]
use resound_debug::logging::{Colorize, print_debug};
use resound_loaders::FileLoader;

create_generational_key!(BodyKey, "The key for a loading or resident sample body");

/// Identifies one physical read: a file plus the extent of its sample body
/// within it. Loads for the same descriptor coalesce into one read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BodyDescriptor {
    pub path: String,
    pub size: u32,
    pub offset: u32,
}

enum BodyStatus {
    NotLoaded,
    Loading,
    Loaded(Arc<[u8]>),
    Failed,
}

struct BodyEntry {
    descriptor: BodyDescriptor,
    status: BodyStatus,
    valid: bool,
    completed: bool,
    post_processed: bool,
    last_used: u64,
}

impl BodyEntry {
    fn new(descriptor: BodyDescriptor) -> Self {
        Self {
            descriptor,
            status: BodyStatus::NotLoaded,
            valid: true,
            completed: false,
            post_processed: false,
            last_used: 0,
        }
    }

    fn drop_body(&mut self) -> usize {
        match std::mem::replace(&mut self.status, BodyStatus::NotLoaded) {
            BodyStatus::Loaded(body) => {
                self.completed = false;
                self.post_processed = false;
                body.len()
            }
            other => {
                self.status = other;
                0
            }
        }
    }
}

struct CacheState {
    entries: GenerationalSlab<BodyKey, BodyEntry>,
    lookup: HashMap<BodyDescriptor, BodyKey>,
    resident_size: usize,
    tick: u64,
}

struct CacheShared {
    loader: Arc<dyn FileLoader>,
    budget: usize,
    state: Mutex<CacheState>,
    load_finished: Condvar,
}

impl CacheShared {
    /// Installs a finished read into the entry, provided the entry still
    /// expects it. Reads completing for an entry that was restarted or
    /// invalidated in the meantime are discarded.
    fn complete_load(&self, key: BodyKey, result: Result<Vec<u8>, ()>, expected_size: u32) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        state.tick += 1;
        let tick = state.tick;
        let mut mounted_size = 0;

        if let Some(entry) = state.entries.get_mut(key)
            && matches!(entry.status, BodyStatus::Loading)
        {
            match result {
                _ if !entry.valid => {
                    entry.status = BodyStatus::Failed;
                    entry.completed = true;
                }
                Ok(data) if data.len() == expected_size as usize => {
                    mounted_size = data.len();
                    entry.status = BodyStatus::Loaded(Arc::from(data));
                    entry.completed = true;
                    entry.last_used = tick;
                }
                _ => {
                    entry.status = BodyStatus::Failed;
                    entry.completed = true;
                    entry.valid = false;
                }
            }
        }

        if mounted_size > 0 {
            state.resident_size += mounted_size;
            enforce_budget(state, self.budget);
        }

        self.load_finished.notify_all();
    }

    fn spawn_load(self: &Arc<Self>, key: BodyKey, descriptor: BodyDescriptor) {
        let shared = Arc::clone(self);

        spawn(move || {
            let result = shared
                .loader
                .get_range(&descriptor.path, descriptor.offset as u64, descriptor.size as usize)
                .map_err(|_error| {
                    #[cfg(feature = "debug")]
                    print_debug!("failed to read sound body {}", descriptor.path.magenta());
                });

            shared.complete_load(key, result, descriptor.size);
        });
    }
}

/// Evicts least-recently-used resident bodies until the budget is met.
/// Bodies that are still borrowed by a mixer are never evicted.
fn enforce_budget(state: &mut CacheState, budget: usize) {
    while state.resident_size > budget {
        let mut candidate: Option<(BodyKey, u64)> = None;

        for (key, entry) in state.entries.iter() {
            if let BodyStatus::Loaded(body) = &entry.status
                && Arc::strong_count(body) == 1
                && candidate.map(|(_, last_used)| entry.last_used < last_used).unwrap_or(true)
            {
                candidate = Some((key, entry.last_used));
            }
        }

        let Some((key, _)) = candidate else {
            break;
        };

        if let Some(entry) = state.entries.get_mut(key) {
            let freed = entry.drop_body();
            state.resident_size -= freed;
        }
    }
}

/// The asynchronous wave body cache.
///
/// Cheap to clone; all clones share the same state and budget.
#[derive(Clone)]
pub struct WaveDataCache {
    shared: Arc<CacheShared>,
}

impl WaveDataCache {
    /// Creates a cache that reads through the given loader and keeps at most
    /// `budget` bytes of sample data resident.
    pub fn new(loader: Arc<dyn FileLoader>, budget: usize) -> Self {
        let state = CacheState {
            entries: GenerationalSlab::default(),
            lookup: HashMap::new(),
            resident_size: 0,
            tick: 0,
        };

        Self {
            shared: Arc::new(CacheShared {
                loader,
                budget,
                state: Mutex::new(state),
                load_finished: Condvar::new(),
            }),
        }
    }

    /// Enqueues an asynchronous read of the described body. Idempotent:
    /// repeated calls for the same descriptor return the existing handle
    /// without issuing another read.
    pub fn async_load(&self, path: &str, size: u32, offset: u32) -> BodyKey {
        let descriptor = BodyDescriptor {
            path: path.to_owned(),
            size,
            offset,
        };

        let mut state = self.shared.state.lock().unwrap();

        if let Some(&key) = state.lookup.get(&descriptor) {
            if let Some(entry) = state.entries.get_mut(key) {
                if matches!(entry.status, BodyStatus::NotLoaded) && entry.valid {
                    entry.status = BodyStatus::Loading;
                    entry.completed = false;
                    drop(state);
                    self.shared.spawn_load(key, descriptor);
                }
                return key;
            }
        }

        let mut entry = BodyEntry::new(descriptor.clone());
        entry.status = BodyStatus::Loading;
        let key = state.entries.insert(entry).expect("body slab is full");
        state.lookup.insert(descriptor.clone(), key);
        drop(state);

        self.shared.spawn_load(key, descriptor);
        key
    }

    /// Non-blocking completion query. Returns `(done, valid)`; a completed
    /// but invalid handle must be restarted with
    /// [`restart_load`](Self::restart_load) before it can serve data again.
    pub fn is_complete(&self, key: BodyKey) -> (bool, bool) {
        let state = self.shared.state.lock().unwrap();

        match state.entries.get(key) {
            Some(entry) => (entry.completed, entry.valid),
            None => (true, false),
        }
    }

    /// Returns whether a read for this handle is currently in flight.
    pub fn is_in_progress(&self, key: BodyKey) -> bool {
        let state = self.shared.state.lock().unwrap();

        matches!(state.entries.get(key), Some(entry) if matches!(entry.status, BodyStatus::Loading))
    }

    /// Returns the body if it is resident right now, without blocking or
    /// touching the disk. This is the only acquisition path the mixer thread
    /// uses.
    pub fn try_get_pointer(&self, key: BodyKey) -> Option<(Arc<[u8]>, bool)> {
        let mut state = self.shared.state.lock().unwrap();

        state.tick += 1;
        let tick = state.tick;

        let entry = state.entries.get_mut(key)?;
        if !entry.valid {
            return None;
        }

        match &entry.status {
            BodyStatus::Loaded(body) => {
                entry.last_used = tick;
                Some((Arc::clone(body), entry.post_processed))
            }
            _ => None,
        }
    }

    /// Returns the body, blocking until an in-flight load completes and
    /// re-mounting it synchronously if it was evicted. Returns `None` for
    /// failed or invalidated handles.
    pub fn get_pointer(&self, key: BodyKey) -> Option<(Arc<[u8]>, bool)> {
        let mut state = self.shared.state.lock().unwrap();

        loop {
            state.tick += 1;
            let tick = state.tick;

            let entry = state.entries.get_mut(key)?;
            if !entry.valid {
                return None;
            }

            match &entry.status {
                BodyStatus::Loaded(body) => {
                    entry.last_used = tick;
                    return Some((Arc::clone(body), entry.post_processed));
                }
                BodyStatus::Failed => return None,
                BodyStatus::Loading => {
                    state = self.shared.load_finished.wait(state).unwrap();
                }
                BodyStatus::NotLoaded => {
                    // Mount synchronously. The lock is released during the
                    // read so the audio thread stays responsive.
                    entry.status = BodyStatus::Loading;
                    entry.completed = false;
                    let descriptor = entry.descriptor.clone();
                    drop(state);

                    let result = self
                        .shared
                        .loader
                        .get_range(&descriptor.path, descriptor.offset as u64, descriptor.size as usize)
                        .map_err(|_| ());
                    self.shared.complete_load(key, result, descriptor.size);

                    state = self.shared.state.lock().unwrap();
                }
            }
        }
    }

    /// Records whether the sample conversion pass has been applied to the
    /// resident body.
    pub fn set_post_processed(&self, key: BodyKey, post_processed: bool) {
        let mut state = self.shared.state.lock().unwrap();

        if let Some(entry) = state.entries.get_mut(key) {
            entry.post_processed = post_processed;
        }
    }

    /// Applies an in-place conversion to the resident body exactly once.
    /// Returns `true` when the body is in converted state afterwards. The
    /// conversion only runs while the cache is the sole owner of the body.
    pub fn post_process(&self, key: BodyKey, convert: impl FnOnce(&mut [u8])) -> bool {
        let mut state = self.shared.state.lock().unwrap();

        let Some(entry) = state.entries.get_mut(key) else {
            return false;
        };

        if entry.post_processed {
            return true;
        }

        if let BodyStatus::Loaded(body) = &mut entry.status
            && let Some(bytes) = Arc::get_mut(body)
        {
            convert(bytes);
            entry.post_processed = true;
            return true;
        }

        false
    }

    /// Hints that the body may be evicted. The entry itself persists so a
    /// later load of the same descriptor is cheap. Borrowed bodies are left
    /// alone.
    pub fn unload(&self, key: BodyKey) {
        let mut guard = self.shared.state.lock().unwrap();
        let state = &mut *guard;

        if let Some(entry) = state.entries.get_mut(key)
            && let BodyStatus::Loaded(body) = &entry.status
            && Arc::strong_count(body) == 1
        {
            let freed = entry.drop_body();
            state.resident_size -= freed;
        }
    }

    /// Marks every entry invalid, for example after a whitelist reload made
    /// the on-disk files untrustworthy. Reads still in flight are discarded
    /// on completion; every handle reports complete-but-invalid until it is
    /// restarted.
    pub fn invalidate_all(&self) {
        let mut guard = self.shared.state.lock().unwrap();
        let state = &mut *guard;

        let keys: Vec<BodyKey> = state.entries.iter().map(|(key, _)| key).collect();
        for key in keys {
            if let Some(entry) = state.entries.get_mut(key) {
                entry.valid = false;
                let freed = entry.drop_body();

                if !matches!(entry.status, BodyStatus::Loading) {
                    entry.status = BodyStatus::Failed;
                    entry.completed = true;
                }

                state.resident_size -= freed;
            }
        }
    }

    /// Revalidates an invalidated handle with a fresh descriptor and starts
    /// a new read.
    pub fn restart_load(&self, key: BodyKey, path: &str, size: u32, offset: u32) {
        let descriptor = BodyDescriptor {
            path: path.to_owned(),
            size,
            offset,
        };

        let mut guard = self.shared.state.lock().unwrap();
        let state = &mut *guard;

        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };

        let old_descriptor = std::mem::replace(&mut entry.descriptor, descriptor.clone());
        let freed = entry.drop_body();
        entry.status = BodyStatus::Loading;
        entry.valid = true;
        entry.completed = false;
        entry.post_processed = false;
        state.resident_size -= freed;

        state.lookup.remove(&old_descriptor);
        state.lookup.insert(descriptor.clone(), key);
        drop(guard);

        self.shared.spawn_load(key, descriptor);
    }

    /// Current count of resident body bytes.
    pub fn resident_size(&self) -> usize {
        self.shared.state.lock().unwrap().resident_size
    }

    /// Returns whether the body for this handle is resident right now.
    pub fn is_resident(&self, key: BodyKey) -> bool {
        let state = self.shared.state.lock().unwrap();

        matches!(state.entries.get(key), Some(entry) if matches!(entry.status, BodyStatus::Loaded(_)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use hashbrown::HashMap;
    use resound_loaders::{FileLoader, FileNotFoundError};

    use crate::WaveDataCache;

    struct MemoryLoader {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemoryLoader {
        fn new(files: &[(&str, Vec<u8>)]) -> Arc<Self> {
            Arc::new(Self {
                files: files.iter().map(|(path, data)| (path.to_string(), data.clone())).collect(),
            })
        }
    }

    impl FileLoader for MemoryLoader {
        fn get(&self, path: &str) -> Result<Vec<u8>, FileNotFoundError> {
            self.files.get(path).cloned().ok_or_else(|| FileNotFoundError::new(path.to_owned()))
        }

        fn file_size(&self, path: &str) -> Result<u64, FileNotFoundError> {
            self.get(path).map(|data| data.len() as u64)
        }
    }

    fn wait_complete(cache: &WaveDataCache, key: crate::BodyKey) -> (bool, bool) {
        for _ in 0..1000 {
            let (done, valid) = cache.is_complete(key);
            if done {
                return (done, valid);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        cache.is_complete(key)
    }

    #[test]
    fn async_load_is_idempotent() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![1; 64])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let first = cache.async_load("sound/a.wav", 32, 0);
        let second = cache.async_load("sound/a.wav", 32, 0);
        let other_extent = cache.async_load("sound/a.wav", 32, 32);

        assert_eq!(first, second);
        assert_ne!(first, other_extent);
    }

    #[test]
    fn loads_and_serves_the_requested_extent() {
        let data: Vec<u8> = (0..64).collect();
        let loader = MemoryLoader::new(&[("sound/a.wav", data)]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 16, 8);
        let (body, post_processed) = cache.get_pointer(key).unwrap();

        assert!(!post_processed);
        assert_eq!(body.as_ref(), (8..24).collect::<Vec<u8>>().as_slice());
        assert_eq!(cache.resident_size(), 16);
    }

    #[test]
    fn missing_file_completes_invalid() {
        let loader = MemoryLoader::new(&[]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/missing.wav", 16, 0);

        assert_eq!(wait_complete(&cache, key), (true, false));
        assert!(cache.get_pointer(key).is_none());
        assert!(cache.try_get_pointer(key).is_none());
    }

    #[test]
    fn short_read_completes_invalid() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![1; 8])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 32, 0);

        assert_eq!(wait_complete(&cache, key), (true, false));
    }

    #[test]
    fn eviction_is_lru_and_skips_borrowed_bodies() {
        let loader = MemoryLoader::new(&[
            ("sound/a.wav", vec![1; 50]),
            ("sound/b.wav", vec![2; 50]),
            ("sound/c.wav", vec![3; 50]),
        ]);
        let cache = WaveDataCache::new(loader, 100);

        let key_a = cache.async_load("sound/a.wav", 50, 0);
        let borrowed = cache.get_pointer(key_a).unwrap();

        let key_b = cache.async_load("sound/b.wav", 50, 0);
        let _ = cache.get_pointer(key_b).unwrap();

        let key_c = cache.async_load("sound/c.wav", 50, 0);
        let _ = cache.get_pointer(key_c).unwrap();

        // The budget only fits two bodies. `a` is the least recently used
        // but still borrowed, so `b` had to go.
        assert!(cache.is_resident(key_a));
        assert!(!cache.is_resident(key_b));
        assert!(cache.is_resident(key_c));
        assert_eq!(cache.resident_size(), 100);

        drop(borrowed);
    }

    #[test]
    fn evicted_bodies_remount_on_demand() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![7; 32])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 32, 0);
        let _ = cache.get_pointer(key).unwrap();

        cache.unload(key);
        assert!(!cache.is_resident(key));
        assert_eq!(cache.resident_size(), 0);

        let (body, _) = cache.get_pointer(key).unwrap();
        assert_eq!(body.len(), 32);
        assert!(cache.is_resident(key));
    }

    #[test]
    fn unload_leaves_borrowed_bodies_alone() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![7; 32])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 32, 0);
        let borrowed = cache.get_pointer(key).unwrap();

        cache.unload(key);
        assert!(cache.is_resident(key));

        drop(borrowed);
        cache.unload(key);
        assert!(!cache.is_resident(key));
    }

    #[test]
    fn post_process_runs_exactly_once() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![128; 4])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 4, 0);
        let _ = cache.get_pointer(key);

        assert!(cache.post_process(key, |bytes| {
            for byte in bytes {
                *byte = byte.wrapping_sub(128);
            }
        }));

        // A second conversion attempt must not touch the samples again.
        assert!(cache.post_process(key, |bytes| {
            for byte in bytes {
                *byte = byte.wrapping_sub(128);
            }
        }));

        let (body, post_processed) = cache.get_pointer(key).unwrap();
        assert!(post_processed);
        assert_eq!(body.as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn invalidation_discards_bodies_until_restarted() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![7; 16])]);
        let cache = WaveDataCache::new(loader, 1 << 20);

        let key = cache.async_load("sound/a.wav", 16, 0);
        let _ = cache.get_pointer(key).unwrap();

        cache.invalidate_all();
        assert_eq!(cache.is_complete(key), (true, false));
        assert_eq!(cache.resident_size(), 0);
        assert!(cache.get_pointer(key).is_none());

        cache.restart_load(key, "sound/a.wav", 16, 0);
        let (body, _) = cache.get_pointer(key).unwrap();
        assert_eq!(body.len(), 16);
        assert_eq!(cache.is_complete(key), (true, true));
    }

    #[test]
    fn reads_in_flight_during_invalidation_are_discarded() {
        let loader = MemoryLoader::new(&[("sound/a.wav", vec![7; 16])]);
        let cache = WaveDataCache::new(loader.clone(), 1 << 20);

        let key = cache.async_load("sound/a.wav", 16, 0);
        cache.invalidate_all();

        // Whether the read raced ahead of the invalidation or not, the entry
        // settles on complete-but-invalid and nothing becomes resident.
        let (done, valid) = wait_complete(&cache, key);
        assert!(done);
        assert!(!valid);
        assert!(!cache.is_resident(key));
        assert_eq!(cache.resident_size(), 0);
    }
}
