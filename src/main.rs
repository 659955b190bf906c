use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use sysinfo::System;
use tracing_subscriber::EnvFilter;
use variant_x86_64::core::catalog::NAMESPACE;
use variant_x86_64::core::hardware::{CpuInspector, HostInspector, InspectorConfig};
use variant_x86_64::core::model::{FeatureConfig, Property};
use variant_x86_64::core::resolver::X8664Resolver;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read CPU flags from this file instead of /proc/cpuinfo
    #[arg(long, global = true)]
    cpuinfo: Option<PathBuf>,

    /// Architecture to classify the host as
    #[arg(long, global = true)]
    arch: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configs the current host supports
    Supported,
    /// Every config a builder could produce
    All,
    /// Check `x86_64 :: feature :: value` properties
    Validate {
        #[arg(required = true)]
        properties: Vec<Property>,
    },
    /// Compiler flags for a property selection
    Flags {
        properties: Vec<Property>,
    },
    /// Describe the detected host CPU
    Host,
}

#[derive(Serialize)]
struct Validation {
    property: String,
    valid: bool,
}

#[derive(Serialize)]
struct HostReport {
    brand: String,
    name: String,
    generic: String,
    features: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_configs(configs: &[FeatureConfig], json: bool) -> Result<(), serde_json::Error> {
    if json {
        return print_json(&configs);
    }
    for config in configs {
        println!("{}: {}", config.name, config.values.join(", "));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = InspectorConfig::from_env();
    if let Some(path) = args.cpuinfo {
        config.cpuinfo_path = path;
    }
    if let Some(arch) = args.arch {
        config.arch = arch;
    }
    let resolver = X8664Resolver::new(HostInspector::new(config));

    match args.command {
        Command::Supported => print_configs(&resolver.get_supported_configs(None)?, args.json)?,
        Command::All => print_configs(&resolver.get_all_configs(), args.json)?,
        Command::Validate { properties } => {
            let results: Vec<Validation> = properties
                .iter()
                .map(|property| Validation {
                    property: property.to_string(),
                    valid: property.namespace == NAMESPACE && resolver.validate_property(property),
                })
                .collect();
            if args.json {
                print_json(&results)?;
            } else {
                for result in &results {
                    let verdict = if result.valid { "valid" } else { "invalid" };
                    println!("{}: {}", result.property, verdict);
                }
            }
            if results.iter().any(|result| !result.valid) {
                std::process::exit(1);
            }
        }
        Command::Flags { properties } => {
            if let Some(foreign) = properties.iter().find(|p| p.namespace != NAMESPACE) {
                return Err(format!("{} is not an {} property", foreign, NAMESPACE).into());
            }
            let setup = resolver.get_build_setup(&properties);
            if args.json {
                print_json(&setup)?;
            } else if setup.is_empty() {
                println!("No level selected, no flags.");
            } else {
                for (category, flags) in &setup.0 {
                    println!("{}: {}", category, flags.join(" "));
                }
            }
        }
        Command::Host => {
            let microarch = resolver.inspector().host()?;
            let sys = System::new_all();
            let report = HostReport {
                brand: sys.global_cpu_info().brand().trim().to_string(),
                name: microarch.name.clone(),
                generic: microarch.generic.clone(),
                features: microarch.features.iter().cloned().collect(),
            };
            if args.json {
                print_json(&report)?;
            } else {
                println!("Brand:    {}", report.brand);
                println!("Name:     {}", report.name);
                println!("Generic:  {}", report.generic);
                println!("Features: {}", report.features.join(" "));
            }
        }
    }

    Ok(())
}
