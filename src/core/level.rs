//! Microarchitecture level helpers.

use crate::core::catalog::MAX_KNOWN_LEVEL;

/// Prefix of the generic names that identify an x86-64 baseline level.
pub const GENERIC_LEVEL_PREFIX: &str = "x86_64_v";

/// Level strings from `v{max_level}` down to `v1`, newest first.
/// `max_level == 0` yields nothing.
pub fn level_range(max_level: u32) -> impl DoubleEndedIterator<Item = String> + Clone {
    (1..=max_level).rev().map(|level| format!("v{}", level))
}

/// Parse a generic microarchitecture name of the form `x86_64_v{N}`.
/// Anything else (another CPU family, plain `x86_64`, `x86_64_vfoo`) is `None`.
/// `x86_64_v0` parses to 0, whose level range is empty.
pub fn parse_generic_level(generic_name: &str) -> Option<u32> {
    generic_name
        .strip_prefix(GENERIC_LEVEL_PREFIX)?
        .parse::<u32>()
        .ok()
}

/// Clamp a detected level to what the catalog knows about.
pub fn cap_level(level: u32) -> u32 {
    level.min(MAX_KNOWN_LEVEL)
}

/// True if `value` is one of `v1..=v{MAX_KNOWN_LEVEL}`.
pub fn is_known_level(value: &str) -> bool {
    level_range(MAX_KNOWN_LEVEL).any(|level| level == value)
}
