//! Conversion options from `brace.toml` and the command line.

use anyhow::{Context, Result};
use brace_transpile::Config;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "brace.toml";

/// Flags that override the file configuration.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Options {
    /// Configuration file (defaults to ./brace.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Package name for the `package` line; empty omits it
    #[arg(long, value_name = "NAME")]
    pub package: Option<String>,

    /// Spaces per indentation level
    #[arg(long, value_name = "N")]
    pub indent: Option<usize>,

    /// Declare every binding as Object
    #[arg(long)]
    pub no_infer: bool,

    /// Fold constant arithmetic before inference
    #[arg(long)]
    pub fold: bool,

    /// Omit access modifiers
    #[arg(long)]
    pub no_access_modifiers: bool,

    /// Reuse and update a saved conversion cache
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Print conversion timing and cache statistics on stderr
    #[arg(long)]
    pub stats: bool,
}

impl Options {
    /// Resolve the effective configuration relative to `dir`.
    pub fn resolve(&self, dir: &Path) -> Result<Config> {
        let mut config = load(self.config.as_deref(), dir)?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(package) = &self.package {
            config.package_name = package.clone();
        }
        if let Some(indent) = self.indent {
            config.indent_size = indent;
        }
        if self.no_infer {
            config.enable_type_inference = false;
        }
        if self.fold {
            config.fold_constants = true;
        }
        if self.no_access_modifiers {
            config.add_access_modifiers = false;
        }
    }
}

/// Read the configuration file. An explicit path must exist; the default
/// file is optional.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(Config::default());
            }
            candidate
        }
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_file_is_read() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "packageName = \"com.example\"\nindentSize = 2\n",
        )
        .unwrap();
        let config = load(None, dir.path()).unwrap();
        assert_eq!(config.package_name, "com.example");
        assert_eq!(config.indent_size, 2);
        assert!(config.enable_type_inference);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("other.toml");
        let err = load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "indentSize = \"wide\"\n").unwrap();
        let err = load(Some(&path), dir.path()).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "packageName = \"from.file\"\nfoldConstants = false\n",
        )
        .unwrap();
        let options = Options {
            package: Some(String::new()),
            indent: Some(8),
            no_infer: true,
            fold: true,
            ..Options::default()
        };
        let config = options.resolve(dir.path()).unwrap();
        assert_eq!(config.package_name, "");
        assert_eq!(config.indent_size, 8);
        assert!(!config.enable_type_inference);
        assert!(config.fold_constants);
        assert!(config.add_access_modifiers);
    }
}
