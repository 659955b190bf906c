//! x86-64 Capability Resolver
//!
//! Turns the static catalog plus one host snapshot into variant configs,
//! validates `x86_64` properties and maps a selection to `-march` flags.

use crate::core::catalog::{is_known_feature, ALL_FEATURES, FEATURE_ON, LEVEL_FEATURE, MAX_KNOWN_LEVEL, NAMESPACE};
use crate::core::hardware::{CpuInspector, HostInspector, InspectError, InspectorConfig};
use crate::core::level::{cap_level, is_known_level, level_range, parse_generic_level};
use crate::core::model::{BuildSetup, FeatureConfig, Property};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Baseline `-march` target; compilers reject `x86-64-v1`.
const BASELINE_MARCH: &str = "-march=x86-64";

pub struct X8664Resolver<I = HostInspector> {
    inspector: I,
}

impl X8664Resolver<HostInspector> {
    /// Resolver backed by the real host, honoring `VARIANT_X86_64_CPUINFO`.
    pub fn from_env() -> Self {
        Self::new(HostInspector::new(InspectorConfig::from_env()))
    }
}

impl Default for X8664Resolver<HostInspector> {
    fn default() -> Self {
        Self::new(HostInspector::default())
    }
}

impl<I: CpuInspector> X8664Resolver<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    /// Every config a builder could produce, independent of the host.
    pub fn get_all_configs(&self) -> Vec<FeatureConfig> {
        std::iter::once(FeatureConfig::new(LEVEL_FEATURE, level_range(MAX_KNOWN_LEVEL)))
            .chain(
                ALL_FEATURES
                    .iter()
                    .map(|feature| FeatureConfig::new(*feature, [FEATURE_ON])),
            )
            .collect()
    }

    /// Configs the current host can run, level first, then features in catalog order.
    ///
    /// `known_properties` is accepted so every provider shares one signature;
    /// x86-64 configs depend only on the host.
    pub fn get_supported_configs(
        &self,
        _known_properties: Option<&HashSet<Property>>,
    ) -> Result<Vec<FeatureConfig>, InspectError> {
        let microarch = self.inspector.host()?;
        let generic = microarch.generic_name();

        let detected = match parse_generic_level(generic) {
            Some(level) => level,
            None => {
                debug!(generic, "host is not an x86-64 baseline, no configs");
                return Ok(Vec::new());
            }
        };

        let level = cap_level(detected);
        if level < detected {
            warn!(detected, capped = level, "host level newer than catalog, capping");
        }

        let mut configs = vec![FeatureConfig::new(LEVEL_FEATURE, level_range(level))];
        configs.extend(
            ALL_FEATURES
                .iter()
                .filter(|feature| microarch.has_feature(feature))
                .map(|feature| FeatureConfig::new(*feature, [FEATURE_ON])),
        );

        debug!(
            host = %microarch.name,
            level,
            features = configs.len() - 1,
            "resolved supported configs"
        );
        Ok(configs)
    }

    /// Catalog-only check; never looks at the host.
    ///
    /// # Panics
    /// If `property.namespace` is not `x86_64`.
    pub fn validate_property(&self, property: &Property) -> bool {
        validate_property(property)
    }

    /// `-march` flags for the first `level` property; compiler identity is
    /// accepted for future per-compiler spellings but does not change the result.
    ///
    /// # Panics
    /// If a property inspected before the first `level` has another namespace.
    pub fn get_compiler_flags(
        &self,
        _language: &str,
        _compiler_name: &str,
        _compiler_version: &str,
        properties: &[Property],
    ) -> Vec<String> {
        march_flag(properties).into_iter().collect()
    }

    /// `cflags`/`cxxflags` for the selection, or an empty setup without a level.
    pub fn get_build_setup(&self, properties: &[Property]) -> BuildSetup {
        match march_flag(properties) {
            Some(flag) => BuildSetup::with_flags(vec![flag]),
            None => BuildSetup::default(),
        }
    }
}

pub fn validate_property(property: &Property) -> bool {
    assert_eq!(
        property.namespace, NAMESPACE,
        "property {} handed to the {} resolver",
        property, NAMESPACE
    );
    if property.feature == LEVEL_FEATURE {
        return is_known_level(&property.value);
    }
    is_known_feature(&property.feature) && property.value == FEATURE_ON
}

/// Compiler target for a level value.
pub fn march_for_level(level: &str) -> String {
    if level == "v1" {
        BASELINE_MARCH.to_string()
    } else {
        format!("{}-{}", BASELINE_MARCH, level)
    }
}

fn march_flag(properties: &[Property]) -> Option<String> {
    for property in properties {
        assert_eq!(
            property.namespace, NAMESPACE,
            "property {} handed to the {} resolver",
            property, NAMESPACE
        );
        if property.feature == LEVEL_FEATURE {
            return Some(march_for_level(&property.value));
        }
    }
    None
}
