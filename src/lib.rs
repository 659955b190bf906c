//! x86-64 microarchitecture level and CPU feature variants.
//!
//! Resolves which `x86-64-v{N}` level and which optional instruction-set
//! extensions a host supports, validates `x86_64 :: feature :: value`
//! properties and maps a selection to `-march` compiler flags.
//!
//! ```
//! use variant_x86_64::core::hardware::Microarchitecture;
//! use variant_x86_64::core::model::Property;
//! use variant_x86_64::core::resolver::X8664Resolver;
//!
//! let host = Microarchitecture::new("haswell", "x86_64_v3", ["avx2", "fma"]);
//! let resolver = X8664Resolver::new(host);
//!
//! let configs = resolver.get_supported_configs(None).unwrap();
//! assert_eq!(configs[0].values, ["v3", "v2", "v1"]);
//!
//! let flags = resolver.get_compiler_flags("c", "gcc", "14", &[Property::new("x86_64", "level", "v3")]);
//! assert_eq!(flags, ["-march=x86-64-v3"]);
//! ```

pub mod core;
pub mod plugin;
