//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Write a default configuration file
pub fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let config = Config::with_base_dir(base_dir);

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Already initialized at {} (use --force to overwrite)",
            config.paths.base_dir.display()
        )));
    }

    std::fs::create_dir_all(&config.paths.base_dir)?;
    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("✓ Initialized ragchat at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Backend: {}", config.backend.base_url);
    println!("\nNext steps:");
    println!("  ragchat ingest ./paper.pdf              # Upload a document");
    println!("  ragchat ask -d <DOCUMENT_ID> \"question\" # Ask about it");
    println!("  ragchat chat ./paper.pdf                # Upload, then chat");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("ragchat");

        let config = cmd_init(Some(base.clone()), false).unwrap();
        assert!(config.paths.config_file.exists());

        assert!(cmd_init(Some(base.clone()), false).is_err());
        assert!(cmd_init(Some(base), true).is_ok());
    }
}
