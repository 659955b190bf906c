//! Feature Catalog
//! Static description of everything the x86-64 resolver knows about.

/// Namespace all x86-64 properties live under.
pub const NAMESPACE: &str = "x86_64";

/// Max microarchitecture level known at the time.
pub const MAX_KNOWN_LEVEL: u32 = 4;

/// Feature name used for the microarchitecture level entry.
pub const LEVEL_FEATURE: &str = "level";

/// The only value a non-level feature can take.
pub const FEATURE_ON: &str = "on";

/// All recognized features, sorted in preference order (most advanced first).
/// The order is observable: configs are emitted in exactly this order.
pub const ALL_FEATURES: &[&str] = &[
    // zen5
    "avx_vnni",
    "cppc",
    "ibrs_enhanced",
    "tsc_adjust",
    // zen4
    "flush_l1d",
    // sapphirerapids
    "movdir64b",
    "movdiri",
    // icelake
    "avx512_bf16",
    "avx512_bitalg",
    "avx512_vbmi2",
    "avx512_vnni",
    "avx512_vp2intersect",
    "avx512_vpopcntdq",
    "avx512ifma",
    "avx512vbmi",
    "rdpid",
    "sha_ni",
    "vaes",
    "vpclmulqdq",
    // skylake_avx512
    "clwb",
    "clzero",
    // x86-64-v4
    "avx512bw",
    "avx512cd",
    "avx512dq",
    "avx512f",
    "avx512vl",
    // skylake
    "clflushopt",
    "gfni",
    "rdseed",
    "xsavec",
    "xsaveopt",
    // broadwell
    "adx",
    // x86-64-v3
    "avx2",
    "avx",
    "bmi2",
    "bmi1",
    "abm",
    "f16c",
    "fma",
    "movbe",
    "xsave",
    // sandybridge
    "rdrand",
    // westmere
    "aes",
    // nehalem
    "pclmulqdq",
    // steamroller
    "sse4a",
    "fsgsbase",
    // x86-64-v2
    "sse4_2",
    "sse4_1",
    "ssse3",
    "sse3",
    "cx16",
    "lahf_lm",
    "popcnt",
    // x86-64-v1
    "sse2",
    "sse",
    "mmx",
];

/// Features each generic level adds on top of the previous one.
/// Index 0 is v1.
static LEVEL_ADDITIONS: [&[&str]; MAX_KNOWN_LEVEL as usize] = [
    &["mmx", "sse", "sse2"],
    &["cx16", "lahf_lm", "popcnt", "sse3", "sse4_1", "sse4_2", "ssse3"],
    &["abm", "avx", "avx2", "bmi1", "bmi2", "f16c", "fma", "movbe", "xsave"],
    &["avx512bw", "avx512cd", "avx512dq", "avx512f", "avx512vl"],
];

pub fn is_known_feature(feature: &str) -> bool {
    ALL_FEATURES.contains(&feature)
}

/// Cumulative features required by generic level `v{level}`.
/// Returns `None` for 0 or anything past `MAX_KNOWN_LEVEL`.
pub fn level_requirements(level: u32) -> Option<impl Iterator<Item = &'static str>> {
    if level == 0 || level > MAX_KNOWN_LEVEL {
        return None;
    }
    Some(
        LEVEL_ADDITIONS[..level as usize]
            .iter()
            .flat_map(|added| added.iter().copied()),
    )
}
