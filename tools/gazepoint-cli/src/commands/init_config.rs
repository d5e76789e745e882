//! Write the default configuration file.

use std::path::PathBuf;

use gazepoint_common::config::{config_file_path, AppConfig};

pub fn run(output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(config_file_path);
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default()
        .save_to(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;

    println!("Default configuration written to: {}", path.display());
    Ok(())
}
