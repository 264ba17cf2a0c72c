//! Config command handlers

use crate::cli::ConfigInitArgs;
use std::fs;

pub const EXAMPLE_CONFIG: &str = include_str!("../../lumi.example.toml");

/// Handle `lumi config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Set OPENAI_API_KEY and edit this file to tune retrieval and generation.");

    Ok(())
}
