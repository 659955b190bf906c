use crate::core::resolver::X8664Resolver;
use crate::plugin::VariantProvider;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a provider for namespace {0:?} is already registered")]
    DuplicateNamespace(String),
}

/// Providers keyed by the namespace they answer for.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Box<dyn VariantProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the x86-64 resolver for the real host.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let x86: Box<dyn VariantProvider> = Box::new(X8664Resolver::from_env());
        registry.providers.insert(x86.namespace(), x86);
        registry
    }

    pub fn register(&mut self, provider: Box<dyn VariantProvider>) -> Result<(), RegistryError> {
        let namespace = provider.namespace();
        if self.providers.contains_key(namespace) {
            return Err(RegistryError::DuplicateNamespace(namespace.to_string()));
        }
        debug!(namespace, "registered variant provider");
        self.providers.insert(namespace, provider);
        Ok(())
    }

    pub fn get(&self, namespace: &str) -> Option<&dyn VariantProvider> {
        self.providers.get(namespace).map(|provider| provider.as_ref())
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hardware::{InspectError, Microarchitecture};
    use crate::core::model::{BuildSetup, FeatureConfig, Property};
    use crate::plugin::ProviderError;
    use std::collections::HashSet;

    /// Minimal second architecture so lookups have something to choose between.
    struct Aarch64Stub;

    impl VariantProvider for Aarch64Stub {
        fn namespace(&self) -> &'static str {
            "aarch64"
        }

        fn get_all_configs(&self) -> Vec<FeatureConfig> {
            vec![FeatureConfig::new("sve", ["on"])]
        }

        fn get_supported_configs(
            &self,
            _known_properties: Option<&HashSet<Property>>,
        ) -> Result<Vec<FeatureConfig>, ProviderError> {
            Ok(Vec::new())
        }

        fn validate_property(&self, property: &Property) -> bool {
            property.feature == "sve" && property.value == "on"
        }

        fn get_compiler_flags(&self, _: &str, _: &str, _: &str, _: &[Property]) -> Vec<String> {
            Vec::new()
        }

        fn get_build_setup(&self, _properties: &[Property]) -> BuildSetup {
            BuildSetup::default()
        }
    }

    fn x86_resolver() -> Box<dyn VariantProvider> {
        Box::new(X8664Resolver::new(Microarchitecture::new(
            "haswell",
            "x86_64_v3",
            ["avx2", "fma"],
        )))
    }

    #[test]
    fn test_lookup_by_namespace() {
        let mut registry = ProviderRegistry::new();
        registry.register(x86_resolver()).unwrap();
        registry.register(Box::new(Aarch64Stub)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.namespaces().collect::<Vec<_>>(), vec!["aarch64", "x86_64"]);

        let x86 = registry.get("x86_64").unwrap();
        assert!(!x86.is_dynamic());
        assert!(x86.validate_property(&Property::new("x86_64", "avx2", "on")));
        let configs = x86.get_supported_configs(None).unwrap();
        assert_eq!(configs[0], FeatureConfig::new("level", ["v3", "v2", "v1"]));
        assert_eq!(
            x86.get_compiler_flags("c", "gcc", "14", &[Property::new("x86_64", "level", "v3")]),
            vec!["-march=x86-64-v3"]
        );

        assert!(registry.get("riscv64").is_none());
    }

    #[test]
    fn test_inspector_error_surfaces_through_provider() {
        let failing = X8664Resolver::new(|| -> Result<Microarchitecture, InspectError> {
            Err(InspectError::NoFeatureLine("/proc/cpuinfo".into()))
        });
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(failing)).unwrap();

        let err = registry.get("x86_64").unwrap().get_supported_configs(None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InspectError>(),
            Some(InspectError::NoFeatureLine(_))
        ));
    }

    #[test]
    fn test_duplicate_namespace_is_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(x86_resolver()).unwrap();
        assert_eq!(
            registry.register(x86_resolver()),
            Err(RegistryError::DuplicateNamespace("x86_64".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_with_defaults_registers_x86_64() {
        let registry = ProviderRegistry::with_defaults();
        let provider = registry.get("x86_64").unwrap();
        assert_eq!(provider.namespace(), "x86_64");
        assert_eq!(provider.get_all_configs().len(), crate::core::catalog::ALL_FEATURES.len() + 1);
    }
}
