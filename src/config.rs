//! Session identity and on-disk layout.
//!
//! Everything lives under one config directory (`$XDG_CONFIG_HOME/xthematic`
//! by default) and is created on first run. The resolved layout is an owned
//! value threaded through the rest of the program; nothing reads the
//! environment after construction.
//!
//! Environment contract:
//! - `TERM_SESSION_ID` (required) scopes custom overrides to this terminal.
//! - `XDG_CONFIG_HOME` overrides the config directory root.
//! - `XTHEMES_DIR` overrides the theme directory.
//! - `XTHEME_LINK_FILE` configures symlink-based permanent activation.

use crate::error::ConfigError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved session identity and file layout.
#[derive(Debug, Clone)]
pub struct Config {
    session_id: String,
    theme_dir: PathBuf,
    custom_file: PathBuf,
    old_theme_file: PathBuf,
    log_dir: PathBuf,
    xresources_file: PathBuf,
    link_file: Option<PathBuf>,
}

impl Config {
    /// Resolve the layout from the environment and bootstrap it on disk.
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_id =
            env::var("TERM_SESSION_ID").map_err(|_| ConfigError::MissingSessionId)?;
        let config_home = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .ok_or(ConfigError::NoHomeDir)?;
        let config_dir = config_home.join("xthematic");
        let theme_dir = env::var_os("XTHEMES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("themes"));
        let link_file = env::var_os("XTHEME_LINK_FILE").map(PathBuf::from);
        let xresources_file = dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".Xresources");
        Self::prepare(session_id, config_dir, theme_dir, xresources_file, link_file)
    }

    /// Create the directory tree and seed files that are missing.
    fn prepare(
        session_id: String,
        config_dir: PathBuf,
        theme_dir: PathBuf,
        xresources_file: PathBuf,
        link_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        ensure_dir(&config_dir)?;
        ensure_dir(&theme_dir)?;
        let log_dir = config_dir.join("logs");
        ensure_dir(&log_dir)?;
        // The custom-colors document must start as an empty JSON object.
        let custom_file = config_dir.join("custom");
        ensure_file(&custom_file, "{}")?;
        let old_theme_file = config_dir.join("old_theme");
        ensure_file(&old_theme_file, "")?;
        ensure_file(&xresources_file, "")?;
        tracing::debug!(
            session = %session_id,
            config = %config_dir.display(),
            themes = %theme_dir.display(),
            "resolved configuration"
        );
        Ok(Self {
            session_id,
            theme_dir,
            custom_file,
            old_theme_file,
            log_dir,
            xresources_file,
            link_file,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn theme_dir(&self) -> &Path {
        &self.theme_dir
    }

    pub fn custom_file(&self) -> &Path {
        &self.custom_file
    }

    pub fn old_theme_file(&self) -> &Path {
        &self.old_theme_file
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn xresources_file(&self) -> &Path {
        &self.xresources_file
    }

    pub fn link_file(&self) -> Option<&Path> {
        self.link_file.as_deref()
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(dir).map_err(|e| ConfigError::Io(dir.to_path_buf(), e))
}

/// Seed `file` with `default_text` if it does not exist yet.
fn ensure_file(file: &Path, default_text: &str) -> Result<(), ConfigError> {
    if file.exists() {
        return Ok(());
    }
    fs::write(file, default_text).map_err(|e| ConfigError::Io(file.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::TestTempDir;

    fn prepared(dir: &TestTempDir) -> Config {
        Config::prepare(
            "w0.0".to_string(),
            dir.child("config"),
            dir.child("config/themes"),
            dir.child("xresources"),
            None,
        )
        .expect("layout should bootstrap")
    }

    #[test]
    fn prepare_creates_layout_and_seed_files() {
        let dir = TestTempDir::new("config");
        let config = prepared(&dir);
        assert!(config.theme_dir().is_dir());
        assert!(config.log_dir().is_dir());
        assert_eq!(fs::read_to_string(config.custom_file()).unwrap(), "{}");
        assert_eq!(fs::read_to_string(config.old_theme_file()).unwrap(), "");
        assert!(config.xresources_file().is_file());
        assert_eq!(config.session_id(), "w0.0");
        assert_eq!(config.link_file(), None);
    }

    #[test]
    fn prepare_leaves_existing_files_alone() {
        let dir = TestTempDir::new("config");
        dir.write_text("config/custom", r##"{"w0.0": {"0": "#123456"}}"##);
        dir.write_text("xresources", "XTerm*font: fixed\n");
        let config = prepared(&dir);
        assert!(fs::read_to_string(config.custom_file())
            .unwrap()
            .contains("#123456"));
        assert_eq!(
            fs::read_to_string(config.xresources_file()).unwrap(),
            "XTerm*font: fixed\n"
        );
    }
}
