//! Binary assets bundled into the executable.

/// Cover image uploaded to every freshly created post unless `cover.path` overrides it.
pub const DEFAULT_COVER_PNG: &[u8] = include_bytes!("../../assets/default-cover.png");
