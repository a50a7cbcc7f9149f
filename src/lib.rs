//! xthematic: inspect, customize, save and activate 16-color terminal
//! palettes for X11 terminals.
//!
//! The engine reconciles three independently-mutable sources of truth into
//! one consistent view: the colors loaded via the X resource database, a
//! per-session JSON store of custom overrides, and named theme files in
//! X-resource syntax. Writes to the view keep the terminal's hardware
//! registers in step.
//!
//! # Quick start
//!
//! ```no_run
//! use xthematic::backend::Xrdb;
//! use xthematic::color::{Color, ColorIdentifier};
//! use xthematic::config::Config;
//! use xthematic::term::{CustomColors, TerminalColors};
//!
//! # fn example() -> Result<(), xthematic::error::AppError> {
//! let config = Config::from_env()?;
//! let custom = CustomColors::load(config.custom_file().to_path_buf(), config.session_id())?;
//! let mut term = TerminalColors::new(Box::new(Xrdb), custom);
//! term.set(ColorIdentifier::from_index(1)?, Color::parse("#ff5555")?)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod render;
pub mod resources;
pub mod term;
#[cfg(test)]
pub mod testsupport;
pub mod themes;
