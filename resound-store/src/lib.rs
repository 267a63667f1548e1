//! Persisted per-asset sound metadata: the cached info record and the keyed,
//! versioned container file it is stored in.

mod container;
mod record;

pub use self::container::{CachedInfoContainer, RecordBuilder, container_metadata_checksum};
pub use self::record::{CachedWaveInfo, InfoFlags, SourceKind};

/// Duration of the always-resident lookahead prefix of a sound body.
pub const LOOKAHEAD_SECONDS: f32 = 0.125;

/// Upper bound for the lookahead body captured into a record.
pub const MAX_CACHED_DATA_SIZE: usize = 32 << 10;

/// Serialized lookahead bodies must stay below this limit.
pub const CACHED_DATA_SIZE_LIMIT: usize = 65_535;

/// Upper bound for the format header blob (ADPCM coefficients or XMA seek
/// table) captured into a record.
pub const MAX_HEADER_SIZE: usize = 32_767;

/// Normalizes an asset path into the canonical cache key: forward slashes,
/// lowercase, with the `sound/` prefix.
pub fn normalize_sound_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/").to_lowercase();

    while let Some(stripped) = normalized.strip_prefix('/') {
        normalized = stripped.to_owned();
    }

    match normalized.starts_with("sound/") {
        true => normalized,
        false => format!("sound/{normalized}"),
    }
}
