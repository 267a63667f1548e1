//! Engine-facing layer of the sound pipeline: partitions the sounds every
//! map references into shared and per-map cache files, rebuilds those files
//! when they go stale, and serves cached asset metadata to the wave sources
//! through three active cache slots that swap on level change.

mod builder;
mod commands;
mod coordinator;
mod directory;
mod language;
mod manifest;

pub use self::builder::{ProgressListener, RebuildReport, SilentProgress};
pub use self::commands::{CommandOutcome, execute_command};
pub use self::coordinator::{CoordinatorSettings, InfoHandle, SoundCacheCoordinator};
pub use self::directory::DirectoryLoader;
pub use self::language::{LANGUAGE_ALLOWLIST_PATH, language_suffix, resolve_language_suffix, system_language};
pub use self::manifest::{
    ManifestAnalyzer, PathInterner, SHARED_PRECACHE_THRESHOLD, SoundPartition, SoundPathKey, find_map_manifests, parse_manifest,
};

/// Directory the persisted cache files live in, relative to the game
/// directory.
pub const CACHE_DIRECTORY: &str = "sound/cache";

/// Directory the per-map manifest files live in, relative to the game
/// directory.
pub const MANIFEST_DIRECTORY: &str = "maps";

/// Byte budget of the wave data cache.
pub const DEFAULT_BODY_BUDGET: usize = 64 << 20; // 64 MiB
