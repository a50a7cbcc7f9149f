//! Ad-hoc colorized output through borrowed color registers.
//!
//! A terminal only has 16 physical color registers, so arbitrary 24-bit
//! swatches are shown by leasing a free register, reprogramming it to the
//! requested color, and printing text that references the register by its
//! 4-bit escape token. Every lease records the register's pre-lease color and
//! is restored when the render scope ends, unconditionally via `Drop`, so
//! error paths cannot leak a repainted register.

use crate::color::{Color, ColorIdentifier};
use crate::error::{DisplayError, TermError};
use crate::term::TerminalColors;
use std::io::{self, Write};

/// One leased register: the color it was taken for and the color it must be
/// restored to.
#[derive(Debug)]
struct Lease {
    id: ColorIdentifier,
    color: Color,
    previous: Color,
}

/// Transient allocation table over the 16 color registers.
pub struct RenderContext<'a> {
    term: &'a mut TerminalColors,
    leases: Vec<Lease>,
}

impl<'a> RenderContext<'a> {
    pub fn new(term: &'a mut TerminalColors) -> Self {
        Self {
            term,
            leases: Vec::new(),
        }
    }

    /// Identifiers not currently leased, lowest index first.
    fn free_identifiers(&self) -> Vec<ColorIdentifier> {
        ColorIdentifier::all()
            .filter(|id| self.leases.iter().all(|lease| lease.id != *id))
            .collect()
    }

    /// Make `color` visible in some register and return that register.
    ///
    /// If the color already matches a currently-visible terminal color no
    /// lease is taken; otherwise the lowest free register is leased and
    /// reprogrammed. A failed reprogram rolls back only this attempted lease;
    /// prior leases stay intact for restoration.
    pub fn register_color(&mut self, color: &Color) -> Result<ColorIdentifier, DisplayError> {
        if let Some(id) = self.term.identifier_of(color)? {
            return Ok(id);
        }
        let Some(id) = self.free_identifiers().into_iter().next() else {
            return Err(DisplayError::NoFreeRegisters);
        };
        let previous = match self.term.get(id) {
            Ok(previous) => previous,
            // A register nothing defines cannot be restored afterwards; skip
            // it and retry is not useful since all 16 share the same source.
            Err(TermError::UnknownIdentifier(_)) => {
                return Err(DisplayError::Term(TermError::UnknownIdentifier(id)))
            }
            Err(e) => return Err(e.into()),
        };
        self.term.set(id, color.clone())?;
        self.leases.push(Lease {
            id,
            color: color.clone(),
            previous,
        });
        tracing::debug!(%id, %color, "leased render register");
        Ok(id)
    }

    /// Release the lease taken for `color`, restoring its register.
    ///
    /// Matching is by the lease's own target color, not the override layer:
    /// a lease whose `set` demoted an existing override leaves no custom
    /// entry behind, yet still holds its register.
    pub fn unregister_color(&mut self, color: &Color) -> Result<(), DisplayError> {
        let position = self.leases.iter().position(|lease| lease.color == *color);
        let Some(position) = position else {
            return Ok(());
        };
        let lease = self.leases.remove(position);
        self.term.set(lease.id, lease.previous)?;
        Ok(())
    }

    /// Restore every leased register to its pre-lease color.
    ///
    /// All leases are attempted even if one restoration fails; the first
    /// error is reported after the sweep.
    pub fn unregister_all(&mut self) -> Result<(), DisplayError> {
        let mut first_error = None;
        for lease in self.leases.drain(..) {
            if let Err(e) = self.term.set(lease.id, lease.previous) {
                tracing::warn!(id = %lease.id, error = %e, "failed to restore leased register");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn leased(&self) -> Vec<ColorIdentifier> {
        self.leases.iter().map(|lease| lease.id).collect()
    }
}

impl Drop for RenderContext<'_> {
    fn drop(&mut self) {
        if !self.leases.is_empty() {
            if let Err(e) = self.unregister_all() {
                tracing::warn!(error = %e, "render scope exit left registers unrestored");
            }
        }
    }
}

/// Colorized text stream over a render scope.
///
/// Dropping the stream restores every borrowed register; [`ColoredStream::close`]
/// does the same but surfaces restoration errors to the caller.
pub struct ColoredStream<'a> {
    context: RenderContext<'a>,
}

impl<'a> ColoredStream<'a> {
    pub fn open(term: &'a mut TerminalColors) -> Self {
        Self {
            context: RenderContext::new(term),
        }
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<'a> {
        &mut self.context
    }

    /// Print `text` with optional foreground/background swatch colors.
    pub fn echo(
        &mut self,
        text: &str,
        fg: Option<&Color>,
        bg: Option<&Color>,
        newline: bool,
    ) -> Result<(), DisplayError> {
        let line = self.format(text, fg, bg)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(line.as_bytes())?;
        if newline {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Build the escaped string without printing it.
    fn format(
        &mut self,
        text: &str,
        fg: Option<&Color>,
        bg: Option<&Color>,
    ) -> Result<String, DisplayError> {
        let mut out = String::new();
        if let Some(bg) = bg {
            let id = self.context.register_color(bg)?;
            out.push_str(&sgr(&background_token(id)));
        }
        if let Some(fg) = fg {
            let id = self.context.register_color(fg)?;
            out.push_str(&sgr(&foreground_token(id)));
        }
        out.push_str(text);
        out.push_str(&sgr("0"));
        Ok(out)
    }

    /// Restore all borrowed registers, reporting any restoration failure.
    pub fn close(mut self) -> Result<(), DisplayError> {
        self.context.unregister_all()
    }
}

fn sgr(token: &str) -> String {
    format!("\x1b[{token}m")
}

/// SGR token selecting a register as the foreground color.
fn foreground_token(id: ColorIdentifier) -> String {
    let index = id.index();
    if index < 8 {
        format!("{}", 30 + u32::from(index))
    } else {
        format!("1;{}", 30 + u32::from(index - 8))
    }
}

/// SGR token selecting a register as the background color.
fn background_token(id: ColorIdentifier) -> String {
    let index = id.index();
    if index < 8 {
        format!("{}", 40 + u32::from(index))
    } else {
        format!("1;{}", 40 + u32::from(index - 8))
    }
}
