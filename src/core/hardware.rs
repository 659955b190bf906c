//! Hardware Detection Module
//! Builds a snapshot of the host CPU: generic level name plus feature flags.

use crate::core::catalog::{level_requirements, MAX_KNOWN_LEVEL};
use crate::core::level::GENERIC_LEVEL_PREFIX;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding where cpuinfo is read from.
pub const CPUINFO_ENV: &str = "VARIANT_X86_64_CPUINFO";
pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Kernel flag spellings that differ from the catalog, and flags implied by others.
const FLAG_ALIASES: &[(&str, &str)] = &[
    ("pni", "sse3"),
    // SSSE3 is a superset of SSE3 and may be the only one listed
    ("ssse3", "sse3"),
];

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no feature flags found in {0}")]
    NoFeatureLine(PathBuf),
}

/// Host CPU descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microarchitecture {
    pub name: String,
    /// `x86_64_v{N}` for a recognized baseline, otherwise the CPU family.
    pub generic: String,
    pub features: BTreeSet<String>,
}

impl Microarchitecture {
    pub fn new<I, S>(name: impl Into<String>, generic: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            generic: generic.into(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify a raw flag set for `arch` and wrap it.
    pub fn classify<I, S>(name: impl Into<String>, arch: &str, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut features: BTreeSet<String> = features.into_iter().map(Into::into).collect();
        for (alias, canonical) in FLAG_ALIASES {
            if features.contains(*alias) {
                features.insert(canonical.to_string());
            }
        }
        let generic = generic_name(arch, &features);
        Self {
            name: name.into(),
            generic,
            features,
        }
    }

    pub fn generic_name(&self) -> &str {
        &self.generic
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Highest known level whose cumulative requirements are all in `features`.
pub fn detect_level(features: &BTreeSet<String>) -> Option<u32> {
    (1..=MAX_KNOWN_LEVEL)
        .take_while(|level| {
            level_requirements(*level)
                .map(|mut required| required.all(|f| features.contains(f)))
                .unwrap_or(false)
        })
        .last()
}

fn generic_name(arch: &str, features: &BTreeSet<String>) -> String {
    if arch != "x86_64" {
        return arch.to_string();
    }
    match detect_level(features) {
        Some(level) => format!("{}{}", GENERIC_LEVEL_PREFIX, level),
        None => arch.to_string(),
    }
}

/// Source of host CPU snapshots.
pub trait CpuInspector {
    fn host(&self) -> Result<Microarchitecture, InspectError>;
}

/// A fixed snapshot inspects as itself.
impl CpuInspector for Microarchitecture {
    fn host(&self) -> Result<Microarchitecture, InspectError> {
        Ok(self.clone())
    }
}

impl<F> CpuInspector for F
where
    F: Fn() -> Result<Microarchitecture, InspectError>,
{
    fn host(&self) -> Result<Microarchitecture, InspectError> {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub cpuinfo_path: PathBuf,
    pub arch: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from(DEFAULT_CPUINFO_PATH),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl InspectorConfig {
    /// Defaults, with the cpuinfo path taken from `VARIANT_X86_64_CPUINFO` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(CPUINFO_ENV) {
            config.cpuinfo_path = PathBuf::from(path);
        }
        config
    }
}

/// The real host: cpuinfo on Linux, `std::arch` runtime detection elsewhere.
#[derive(Debug, Clone, Default)]
pub struct HostInspector {
    config: InspectorConfig,
}

impl HostInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Read and classify a cpuinfo file.
    pub fn from_cpuinfo(&self) -> Result<Microarchitecture, InspectError> {
        let path = &self.config.cpuinfo_path;
        debug!(path = %path.display(), "reading cpuinfo");
        let content = std::fs::read_to_string(path).map_err(|source| InspectError::Io {
            path: path.clone(),
            source,
        })?;

        let info = CpuInfo::parse(&content);
        let arch = self.config.arch.as_str();
        let flags = match info.flags {
            Some(flags) => flags,
            // riscv64, ppc64le and s390x have no flags line; they classify by arch alone
            None if arch != "x86_64" => {
                debug!(arch, "no feature line in cpuinfo");
                Vec::new()
            }
            None => return Err(InspectError::NoFeatureLine(path.clone())),
        };
        let name = info.model_name.unwrap_or_else(|| arch.to_string());
        Ok(Microarchitecture::classify(name, arch, flags))
    }
}

impl CpuInspector for HostInspector {
    #[cfg(target_os = "linux")]
    fn host(&self) -> Result<Microarchitecture, InspectError> {
        self.from_cpuinfo()
    }

    #[cfg(not(target_os = "linux"))]
    fn host(&self) -> Result<Microarchitecture, InspectError> {
        let arch = self.config.arch.as_str();
        Ok(Microarchitecture::classify(arch, arch, runtime_features()))
    }
}

/// The fields of the first processor block we care about.
#[derive(Debug, Default)]
struct CpuInfo {
    model_name: Option<String>,
    flags: Option<Vec<String>>,
}

impl CpuInfo {
    fn parse(content: &str) -> Self {
        let mut info = CpuInfo::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                // Every processor block repeats the same flags
                if info.flags.is_some() {
                    break;
                }
                continue;
            }

            let key = line.split(':').next().map(str::trim).unwrap_or_default();
            match key {
                "model name" if info.model_name.is_none() => {
                    info.model_name = parse_value(line).map(str::to_string);
                }
                // x86 spells it `flags`, ARM `Features`
                "flags" | "Features" if info.flags.is_none() => {
                    let flags = parse_value(line)
                        .unwrap_or_default()
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                    info.flags = Some(flags);
                }
                _ => {}
            }
        }

        info
    }
}

fn parse_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}

/// Catalog features `std` can detect at runtime, in catalog spelling.
#[cfg(all(not(target_os = "linux"), target_arch = "x86_64"))]
fn runtime_features() -> Vec<String> {
    macro_rules! detect {
        ($($std:tt => $name:expr),* $(,)?) => {{
            let mut found = Vec::new();
            $(
                if std::is_x86_feature_detected!($std) {
                    found.push($name.to_string());
                }
            )*
            found
        }};
    }

    // x86-64 baseline
    let mut features: Vec<String> = ["mmx", "sse", "sse2"].iter().map(|f| f.to_string()).collect();
    features.extend(detect! {
        "sse3" => "sse3",
        "ssse3" => "ssse3",
        "sse4.1" => "sse4_1",
        "sse4.2" => "sse4_2",
        "sse4a" => "sse4a",
        "popcnt" => "popcnt",
        "cmpxchg16b" => "cx16",
        "avx" => "avx",
        "avx2" => "avx2",
        "fma" => "fma",
        "f16c" => "f16c",
        "bmi1" => "bmi1",
        "bmi2" => "bmi2",
        "lzcnt" => "abm",
        "movbe" => "movbe",
        "xsave" => "xsave",
        "xsaveopt" => "xsaveopt",
        "xsavec" => "xsavec",
        "aes" => "aes",
        "pclmulqdq" => "pclmulqdq",
        "rdrand" => "rdrand",
        "rdseed" => "rdseed",
        "adx" => "adx",
        "sha" => "sha_ni",
        "avx512f" => "avx512f",
        "avx512cd" => "avx512cd",
        "avx512bw" => "avx512bw",
        "avx512dq" => "avx512dq",
        "avx512vl" => "avx512vl",
    });
    // `std` has no detector for LAHF/SAHF; every CPU with CMPXCHG16B has it
    if features.iter().any(|f| f == "cx16") {
        features.push("lahf_lm".to_string());
    }
    features
}

#[cfg(all(not(target_os = "linux"), not(target_arch = "x86_64")))]
fn runtime_features() -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const X86_CPUINFO: &str = "\
processor\t: 0
vendor_id\t: AuthenticAMD
model name\t: AMD FX(tm)-8350 Eight-Core Processor
flags\t\t: fpu vme de pse tsc msr pae mce cx8 apic sep mtrr pge mca cmov pat pse36 clflush mmx fxsr sse sse2 ht syscall nx mmxext fxsr_opt pdpe1gb rdtscp lm constant_tsc rep_good nopl nonstop_tsc cpuid extd_apicid aperfmperf pni pclmulqdq monitor ssse3 fma cx16 sse4_1 sse4_2 popcnt aes xsave avx f16c lahf_lm cmp_legacy svm extapic cr8_legacy abm sse4a misalignsse 3dnowprefetch osvw ibs xop skinit wdt fma4 tce nodeid_msr tbm topoext perfctr_core perfctr_nb cpb hw_pstate ssbd ibpb vmmcall bmi1 arat npt lbrv svm_lock nrip_save tsc_scale vmcb_clean flushbyasid decodeassists pausefilter pfthreshold

processor\t: 1
vendor_id\t: AuthenticAMD
model name\t: AMD FX(tm)-8350 Eight-Core Processor
flags\t\t: fpu vme de pse tsc msr pae mce cx8 apic sep mtrr pge mca cmov pat pse36 clflush mmx fxsr sse sse2
";

    const ARM_CPUINFO: &str = "\
processor\t: 0
BogoMIPS\t: 108.00
Features\t: fp asimd evtstrm crc32 cpuid
CPU implementer\t: 0x41
CPU part\t: 0xd08
";

    const RISCV_CPUINFO: &str = "\
processor\t: 0
hart\t\t: 1
isa\t\t: rv64imafdc
mmu\t\t: sv39
";

    fn write_fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn inspector(path: &std::path::Path, arch: &str) -> HostInspector {
        HostInspector::new(InspectorConfig {
            cpuinfo_path: path.to_path_buf(),
            arch: arch.to_string(),
        })
    }

    #[test]
    fn test_parse_first_processor_block() {
        let info = CpuInfo::parse(X86_CPUINFO);
        assert_eq!(
            info.model_name.as_deref(),
            Some("AMD FX(tm)-8350 Eight-Core Processor")
        );
        let flags = info.flags.unwrap();
        assert!(flags.contains(&"sse4a".to_string()));
        assert!(flags.contains(&"avx".to_string()));
        // Second block is truncated; we must have kept the first one
        assert!(flags.contains(&"lahf_lm".to_string()));
    }

    #[test]
    fn test_classify_piledriver_as_v2() {
        let file = write_fixture(X86_CPUINFO);
        let host = inspector(file.path(), "x86_64").from_cpuinfo().unwrap();
        // Has avx/fma/f16c/bmi1 but no avx2/bmi2/movbe
        assert_eq!(host.generic_name(), "x86_64_v2");
        assert!(host.has_feature("fma"));
        assert!(!host.has_feature("avx2"));
        // `pni` is how the kernel spells SSE3
        assert!(host.has_feature("sse3"));
    }

    #[test]
    fn test_classify_arm_keeps_family_name() {
        let file = write_fixture(ARM_CPUINFO);
        let host = inspector(file.path(), "aarch64").from_cpuinfo().unwrap();
        assert_eq!(host.generic_name(), "aarch64");
        assert_eq!(host.name, "aarch64");
        assert!(host.has_feature("asimd"));
    }

    #[test]
    fn test_detect_level() {
        let v1: BTreeSet<String> = ["mmx", "sse", "sse2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(detect_level(&v1), Some(1));

        let mut v4: BTreeSet<String> = BTreeSet::new();
        for level in 1..=MAX_KNOWN_LEVEL {
            v4.extend(level_requirements(level).unwrap().map(str::to_string));
        }
        assert_eq!(detect_level(&v4), Some(4));

        // A hole in v2 caps the level at v1 even with v3 features present
        v4.remove("popcnt");
        assert_eq!(detect_level(&v4), Some(1));

        assert_eq!(detect_level(&BTreeSet::new()), None);
    }

    #[test]
    fn test_riscv_without_feature_line_keeps_family_name() {
        let file = write_fixture(RISCV_CPUINFO);
        let host = inspector(file.path(), "riscv64").from_cpuinfo().unwrap();
        assert_eq!(host.generic_name(), "riscv64");
        assert!(host.features.is_empty());
    }

    #[test]
    fn test_x86_without_baseline_is_plain_x86_64() {
        let host = Microarchitecture::classify("old", "x86_64", ["fpu", "mmx"]);
        assert_eq!(host.generic_name(), "x86_64");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("cpuinfo");
        let err = inspector(&missing, "x86_64").from_cpuinfo().unwrap_err();
        assert!(matches!(err, InspectError::Io { .. }));
    }

    #[test]
    fn test_cpuinfo_without_flags_is_rejected() {
        let file = write_fixture("processor\t: 0\nmodel name\t: mystery\n");
        let err = inspector(file.path(), "x86_64").from_cpuinfo().unwrap_err();
        assert!(matches!(err, InspectError::NoFeatureLine(_)));
    }

    #[test]
    fn test_snapshot_inspects_as_itself() {
        let snapshot = Microarchitecture::new("bulldozer", "x86_64_v2", ["avx", "sse4a"]);
        assert_eq!(snapshot.host().unwrap(), snapshot);
    }
}
