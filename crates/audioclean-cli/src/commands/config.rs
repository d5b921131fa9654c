use anyhow::Result;
use audioclean_core::config::Config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("audioclean configuration\n");
    print!("{}", config.to_toml()?);

    if config.model.weights.is_none() {
        println!("\n# model.weights unset: built-in RNNoise weights");
    }
    println!("# scratch root: {}", config.temp_dir().display());

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    println!("  1. Environment variables (AUDIOCLEAN_*, nested keys split on \"__\")");
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    if let Some(p) = Config::default_path() {
        println!("  3. {}", p.display());
    }
    println!("  4. Built-in defaults");

    Ok(())
}
