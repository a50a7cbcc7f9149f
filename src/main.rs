//! CLI entry point for xthematic.

mod cli;

use clap::Parser;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use xthematic::backend::Xrdb;
use xthematic::color::{Color, ColorIdentifier};
use xthematic::config::Config;
use xthematic::display::ColoredStream;
use xthematic::error::{AppError, DisplayError};
use xthematic::render::Renderer;
use xthematic::term::{CustomColors, TerminalColors};
use xthematic::themes::Themes;

const DEFAULT_VIEW_TEXT: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn main() {
    let args = cli::Args::parse();
    let renderer = Renderer::new(!args.no_color);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            renderer.error(&e.to_string());
            std::process::exit(1);
        }
    };
    let _log_guard = init_logging(&config);

    if let Err(e) = run(args.command, &renderer, &config) {
        renderer.error(&e.to_string());
        std::process::exit(1);
    }
}

/// Warnings and above on stderr, everything from debug up in a log file under
/// the config directory. `RUST_LOG` overrides the stderr level.
fn init_logging(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(config.log_dir(), "xthematic.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time()
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug")),
        )
        .init();
    guard
}

fn run(command: cli::Command, renderer: &Renderer, config: &Config) -> Result<(), AppError> {
    let custom = CustomColors::load(config.custom_file().to_path_buf(), config.session_id())?;
    let mut term = TerminalColors::new(Box::new(Xrdb), custom);
    let themes = Themes::new(config);

    match command {
        cli::Command::View {
            views,
            foreground,
            background,
            text,
        } => run_view(&mut term, &views, foreground, background, text),
        cli::Command::Theme {
            theme_name,
            deactivate,
            list,
            remove,
            activate,
            permanent,
            save,
            overwrite,
        } => {
            if list {
                renderer.message(&themes.list()?.join(" "));
                return Ok(());
            }
            if deactivate {
                themes.deactivate(&mut term)?;
                return Ok(());
            }
            let Some(name) = theme_name else {
                let colors = term.visible()?;
                return echo_palette(&mut term, &colors);
            };
            if activate {
                themes.activate(&mut term, &name, permanent)?;
            } else if save {
                themes.save(&mut term, &name, overwrite)?;
            } else if remove {
                themes.remove(&name)?;
            } else {
                let colors = themes.contents(&name)?.colors().clone();
                echo_palette(&mut term, &colors)?;
            }
            Ok(())
        }
        cli::Command::Color {
            color_id,
            color,
            reset,
            theme_name,
        } => {
            if reset {
                term.reset_customized()?;
                return Ok(());
            }
            // clap guarantees the id is present unless --reset was given.
            let Some(id) = color_id else {
                return Ok(());
            };
            match (theme_name, color) {
                (Some(theme), Some(new)) => themes.set_color(&theme, id, new)?,
                (Some(theme), None) => {
                    let current = themes.color(&theme, id)?;
                    echo_swatch(&mut term, &current)?;
                }
                (None, Some(new)) => term.set(id, new)?,
                (None, None) => {
                    let current = term.get(id)?;
                    echo_swatch(&mut term, &current)?;
                }
            }
            Ok(())
        }
    }
}

/// Render each color view on its own line, wait for Enter, then restore.
fn run_view(
    term: &mut TerminalColors,
    views: &[cli::ColorView],
    foreground: Option<Color>,
    background: Option<Color>,
    text: Option<String>,
) -> Result<(), AppError> {
    let fallback_text = text.unwrap_or_else(|| DEFAULT_VIEW_TEXT.to_string());
    let last = views.len().saturating_sub(1);
    let mut stream = ColoredStream::open(term);
    for (i, view) in views.iter().enumerate() {
        let fg = view.foreground.as_ref().or(foreground.as_ref());
        let bg = view.background.as_ref().or(background.as_ref());
        let line = view.text.as_deref().unwrap_or(&fallback_text);
        stream.echo(line, fg, bg, i != last)?;
    }
    wait_for_enter().map_err(DisplayError::from)?;
    stream.close()?;
    Ok(())
}

/// Print one line per defined register, named and colored accordingly.
fn echo_palette(
    term: &mut TerminalColors,
    colors: &BTreeMap<ColorIdentifier, Color>,
) -> Result<(), AppError> {
    let mut stream = ColoredStream::open(term);
    for id in ColorIdentifier::all() {
        let Some(color) = colors.get(&id) else {
            continue;
        };
        stream.echo(&id.four_bit_name(), Some(color), None, true)?;
    }
    wait_for_enter().map_err(DisplayError::from)?;
    stream.close()?;
    Ok(())
}

/// Show one color as foreground and as background, labelled with its hex code.
fn echo_swatch(term: &mut TerminalColors, color: &Color) -> Result<(), AppError> {
    let mut stream = ColoredStream::open(term);
    stream.echo(color.hex(), Some(color), None, true)?;
    stream.echo(color.hex(), None, Some(color), false)?;
    wait_for_enter().map_err(DisplayError::from)?;
    stream.close()?;
    Ok(())
}

/// The rendered swatches stay visible until the user presses Enter.
fn wait_for_enter() -> io::Result<()> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
