//! External collaborators: the X resource database and the terminal hardware.
//!
//! The core never shells out directly; it talks to a [`ResourceBackend`], which
//! keeps the engine testable and confines process invocation to one place.
//! All invocations are synchronous and blocking with no timeout: a hung
//! external tool hangs the operation, by design.

use crate::error::ProcessError;
use std::path::Path;
use std::process::Command;

/// Capabilities the color engine consumes from the outside world.
pub trait ResourceBackend {
    /// Return the full current X resource set as text (`xrdb -query`).
    fn query_resources(&self) -> Result<String, ProcessError>;

    /// Make the terminal re-read resources from `file`, optionally with an
    /// include search path for `#include` statements.
    fn reload_resources(&self, file: &Path, include_dir: Option<&Path>)
        -> Result<(), ProcessError>;

    /// Reprogram one terminal color register. Channels are on a 0–1000 scale.
    fn set_register(&self, index: u8, rgb: (u32, u32, u32)) -> Result<(), ProcessError>;
}

/// The real backend: `xrdb` for the resource database, `tput initc` for
/// register writes.
#[derive(Debug, Default)]
pub struct Xrdb;

impl ResourceBackend for Xrdb {
    fn query_resources(&self) -> Result<String, ProcessError> {
        run_capture("xrdb", &["-query".to_string()])
    }

    fn reload_resources(
        &self,
        file: &Path,
        include_dir: Option<&Path>,
    ) -> Result<(), ProcessError> {
        let mut args = Vec::new();
        if let Some(dir) = include_dir {
            args.push(format!("-I{}", dir.display()));
        }
        args.push("-load".to_string());
        args.push(file.display().to_string());
        run_capture("xrdb", &args).map(|_| ())
    }

    fn set_register(&self, index: u8, (r, g, b): (u32, u32, u32)) -> Result<(), ProcessError> {
        let args = vec![
            "initc".to_string(),
            index.to_string(),
            r.to_string(),
            g.to_string(),
            b.to_string(),
        ];
        run_capture("tput", &args).map(|_| ())
    }
}

/// Run a program to completion and return its stdout, or a contextual error.
fn run_capture(program: &str, args: &[String]) -> Result<String, ProcessError> {
    tracing::debug!(program, ?args, "invoking external tool");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(ProcessError::Status {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
