//! Resolve command - Show where a module reference is fetched from.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tfwrap_core::{default_wrapper_name, GeneratorSettings, ModuleReference, SourceResolver};

use super::OutputFormat;

#[derive(Args)]
pub struct ResolveArgs {
    /// Module source (registry reference, git URL or local path)
    #[arg(short, long, env = "TFWRAP_SOURCE")]
    pub source: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct Resolution {
    source: String,
    kind: String,
    fetch_location: String,
    sub_path: Option<String>,
    pinned_ref: Option<String>,
    wrapper_name: String,
}

pub async fn execute(args: ResolveArgs, settings: GeneratorSettings) -> Result<()> {
    let reference = ModuleReference::new(&args.source, None)?;
    let location = SourceResolver::new(&settings.default_host).resolve(reference.raw_source());

    let resolution = Resolution {
        source: reference.raw_source().to_string(),
        kind: location.kind.to_string(),
        fetch_location: location.fetch_location,
        sub_path: location.sub_path,
        pinned_ref: location.pinned_ref,
        wrapper_name: default_wrapper_name(reference.raw_source()),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&resolution)?),
        OutputFormat::Table => {
            println!("Source:       {}", resolution.source);
            println!("Kind:         {}", resolution.kind);
            println!("Fetch from:   {}", resolution.fetch_location);
            println!(
                "Sub-path:     {}",
                resolution.sub_path.as_deref().unwrap_or("-")
            );
            println!(
                "Pinned ref:   {}",
                resolution.pinned_ref.as_deref().unwrap_or("-")
            );
            println!("Wrapper name: {}", resolution.wrapper_name);
        }
    }

    Ok(())
}
