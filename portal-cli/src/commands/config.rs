use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use shared::config::ClientConfig;

/// Writes a configuration file with default values.
///
/// # Arguments
/// * `format` - `yaml`, `json` or `toml`.
/// * `output` - Target path; defaults to `portal.<format>` in the working directory.
///
/// # Errors
/// Returns an error if the format is unsupported or writing the file fails.
pub fn generate_config(format: &str, output: Option<PathBuf>) -> Result<()> {
    let config = ClientConfig::with_defaults();
    let serialized = render(&config, format)?;
    let path = output.unwrap_or_else(|| PathBuf::from(format!("portal.{format}")));

    fs::write(&path, serialized)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Configuration file '{}' generated successfully.",
        path.display()
    );
    Ok(())
}

fn render(config: &ClientConfig, format: &str) -> Result<String> {
    Ok(match format {
        "yaml" => serde_yml::to_string(config)?,
        "json" => serde_json::to_string_pretty(config)?,
        "toml" => toml::to_string_pretty(config)?,
        _ => bail!("Unsupported format. Use 'yaml', 'json' or 'toml'."),
    })
}
