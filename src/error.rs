//! Unified error types for the palette engine.

use crate::color::ColorIdentifier;
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ColorError
// ---------------------------------------------------------------------------

/// Errors constructing color value types from user input.
#[derive(Debug)]
pub enum ColorError {
    /// Not a 6-hex-digit code (with optional leading `#`).
    InvalidHex(String),
    /// Color index outside [0, 16).
    InvalidIdentifier(u8),
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex(code) => write!(f, "`{code}` is not a valid hex code"),
            Self::InvalidIdentifier(index) => {
                write!(f, "color index {index} is not a valid 4-bit color")
            }
        }
    }
}

impl std::error::Error for ColorError {}

// ---------------------------------------------------------------------------
// ProcessError
// ---------------------------------------------------------------------------

/// Failures invoking an external tool (`xrdb`, `tput`).
#[derive(Debug)]
pub enum ProcessError {
    /// The process could not be started at all.
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The process ran and exited non-zero.
    Status {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "failed to run {program}: {source}"),
            Self::Status {
                program,
                code,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "{program} exited with status {code}")?,
                    None => write!(f, "{program} was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ProcessError {}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failures reading or rewriting the shared custom-colors document.
#[derive(Debug)]
pub enum StoreError {
    Io(PathBuf, std::io::Error),
    Json(PathBuf, serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "custom colors file {}: {e}", path.display()),
            Self::Json(path, e) => write!(
                f,
                "custom colors file {} is not valid JSON: {e}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// TermError
// ---------------------------------------------------------------------------

/// Errors from the layered terminal-color engine.
#[derive(Debug)]
pub enum TermError {
    /// `xrdb -query` failed or produced output the cache could not parse.
    CacheRefresh(String),
    /// The hardware register write failed. The register state is unknown
    /// afterwards; callers must not assume success or attempt rollback.
    SetColor { id: ColorIdentifier, detail: String },
    /// Custom-override store I/O or serialization failure.
    Store(StoreError),
    /// The identifier is defined in neither the loaded nor the custom layer.
    UnknownIdentifier(ColorIdentifier),
    /// Loaded and override state disagree; a design-assumption failure that
    /// should surface loudly rather than be swallowed.
    Invariant(String),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheRefresh(msg) => write!(f, "failed to refresh loaded colors: {msg}"),
            Self::SetColor { id, detail } => {
                write!(f, "failed to set terminal color {id}: {detail}")
            }
            Self::Store(e) => write!(f, "{e}"),
            Self::UnknownIdentifier(id) => write!(f, "no color is defined for {id}"),
            Self::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for TermError {}

impl From<StoreError> for TermError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// DisplayError
// ---------------------------------------------------------------------------

/// Errors from the transient render-register allocator and echo stream.
#[derive(Debug)]
pub enum DisplayError {
    /// All 16 registers are leased within the current render scope.
    NoFreeRegisters,
    /// Underlying terminal-color engine failure.
    Term(TermError),
    /// Writing to standard output failed.
    Io(std::io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFreeRegisters => write!(
                f,
                "cannot register any more colors: all 16 registers are in use"
            ),
            Self::Term(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "failed to write to stdout: {e}"),
        }
    }
}

impl std::error::Error for DisplayError {}

impl From<TermError> for DisplayError {
    fn from(e: TermError) -> Self {
        Self::Term(e)
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// ThemeError
// ---------------------------------------------------------------------------

/// Errors from theme persistence and activation.
#[derive(Debug)]
pub enum ThemeError {
    /// Saving would overwrite an existing theme without `--overwrite`.
    Exists(String),
    /// The named theme file does not exist.
    NotFound(String),
    Io(PathBuf, std::io::Error),
    /// Theme text contained an entry that is not a valid color resource.
    Parse(String),
    /// Bulk color application failed.
    Term(TermError),
    /// `xrdb -load` failed after the theme was put in place.
    Reload(ProcessError),
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists(name) => write!(f, "there already exists a theme `{name}`"),
            Self::NotFound(name) => write!(f, "theme `{name}` does not exist"),
            Self::Io(path, e) => write!(f, "theme file {}: {e}", path.display()),
            Self::Parse(msg) => write!(f, "invalid theme contents: {msg}"),
            Self::Term(e) => write!(f, "{e}"),
            Self::Reload(e) => write!(f, "failed to reload resources: {e}"),
        }
    }
}

impl std::error::Error for ThemeError {}

impl From<TermError> for ThemeError {
    fn from(e: TermError) -> Self {
        Self::Term(e)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors resolving the on-disk layout and session identity.
#[derive(Debug)]
pub enum ConfigError {
    /// `$TERM_SESSION_ID` is not set; custom overrides cannot be scoped.
    MissingSessionId,
    /// No home directory could be determined.
    NoHomeDir,
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSessionId => {
                write!(f, "$TERM_SESSION_ID is not set - see install instructions")
            }
            Self::NoHomeDir => write!(f, "could not determine the user home directory"),
            Self::Io(path, e) => write!(f, "cannot prepare {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// AppError (top-level)
// ---------------------------------------------------------------------------

/// Top-level error surfaced at the CLI boundary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Color(ColorError),
    Term(TermError),
    Display(DisplayError),
    Theme(ThemeError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Color(e) => write!(f, "{e}"),
            Self::Term(e) => write!(f, "{e}"),
            Self::Display(e) => write!(f, "{e}"),
            Self::Theme(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ColorError> for AppError {
    fn from(e: ColorError) -> Self {
        Self::Color(e)
    }
}

impl From<TermError> for AppError {
    fn from(e: TermError) -> Self {
        Self::Term(e)
    }
}

impl From<DisplayError> for AppError {
    fn from(e: DisplayError) -> Self {
        Self::Display(e)
    }
}

impl From<ThemeError> for AppError {
    fn from(e: ThemeError) -> Self {
        Self::Theme(e)
    }
}
