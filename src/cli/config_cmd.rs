use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::core::config::AppConfig;

pub fn init() -> Result<()> {
    init_at(&AppConfig::config_path())
}

fn init_at(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    AppConfig::default()
        .save_to(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    println!("Generated config at {}", path.display());
    println!("  Add credentials under [aws] or [hwc], or export them in the environment.");
    Ok(())
}

pub fn check() -> Result<()> {
    check_at(&AppConfig::config_path())
}

fn check_at(path: &Path) -> Result<()> {
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `cspend config init` to create one.");
        return Ok(());
    }

    let config = AppConfig::load_from(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    let issues = config.validate();
    if !issues.is_empty() {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        bail!(
            "{} config issue{}",
            issues.len(),
            if issues.len() == 1 { "" } else { "s" }
        );
    }

    println!("Config is valid: {}", path.display());
    println!("  Default provider: {}", config.settings.provider);
    Ok(())
}

pub fn path() -> Result<()> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cspend").join("config.toml");
        init_at(&path).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.settings.provider, "aws");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings]\nprovider = \"hwc\"\n").unwrap();
        init_at(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("provider = \"hwc\""));
    }

    #[test]
    fn check_fails_on_issues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings]\ndefault_format = \"yaml\"\n").unwrap();
        let err = check_at(&path).unwrap_err();
        assert!(err.to_string().contains("1 config issue"));
    }

    #[test]
    fn check_passes_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[aws]\ngranularity = \"monthly\"\n").unwrap();
        check_at(&path).unwrap();
    }
}
