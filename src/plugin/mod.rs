//! Provider plumbing: the capability interface a variant host calls, and a
//! registry that selects a provider by namespace.

pub mod registry;

use crate::core::hardware::CpuInspector;
use crate::core::model::{BuildSetup, FeatureConfig, Property};
use crate::core::resolver::X8664Resolver;
use std::collections::HashSet;

/// Failure of a provider's host query; each provider brings its own error type.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// What a variant host needs from one namespace of capability data.
pub trait VariantProvider: Send + Sync {
    fn namespace(&self) -> &'static str;

    /// Dynamic providers need other providers' properties to compute configs.
    fn is_dynamic(&self) -> bool {
        false
    }

    fn get_all_configs(&self) -> Vec<FeatureConfig>;

    fn get_supported_configs(
        &self,
        known_properties: Option<&HashSet<Property>>,
    ) -> Result<Vec<FeatureConfig>, ProviderError>;

    fn validate_property(&self, property: &Property) -> bool;

    fn get_compiler_flags(
        &self,
        language: &str,
        compiler_name: &str,
        compiler_version: &str,
        properties: &[Property],
    ) -> Vec<String>;

    fn get_build_setup(&self, properties: &[Property]) -> BuildSetup;
}

impl<I> VariantProvider for X8664Resolver<I>
where
    I: CpuInspector + Send + Sync,
{
    fn namespace(&self) -> &'static str {
        crate::core::catalog::NAMESPACE
    }

    fn get_all_configs(&self) -> Vec<FeatureConfig> {
        X8664Resolver::get_all_configs(self)
    }

    fn get_supported_configs(
        &self,
        known_properties: Option<&HashSet<Property>>,
    ) -> Result<Vec<FeatureConfig>, ProviderError> {
        Ok(X8664Resolver::get_supported_configs(self, known_properties)?)
    }

    fn validate_property(&self, property: &Property) -> bool {
        X8664Resolver::validate_property(self, property)
    }

    fn get_compiler_flags(
        &self,
        language: &str,
        compiler_name: &str,
        compiler_version: &str,
        properties: &[Property],
    ) -> Vec<String> {
        X8664Resolver::get_compiler_flags(self, language, compiler_name, compiler_version, properties)
    }

    fn get_build_setup(&self, properties: &[Property]) -> BuildSetup {
        X8664Resolver::get_build_setup(self, properties)
    }
}
