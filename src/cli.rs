//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};
use xthematic::color::{Color, ColorIdentifier};

/// Inspect, customize, save and activate terminal color themes.
#[derive(Debug, Parser)]
#[command(name = "xthematic", version)]
pub struct Args {
    /// Disable color output for status messages.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display colors in the terminal through color view specs.
    ///
    /// A color view is `foreground_hex:background_hex:text`, each field
    /// optional: `#FF0000::hello` prints hello in red on the default
    /// background, `:#FF0000` prints default text on red.
    View {
        /// Color views, one rendered line each.
        #[arg(required = true, value_parser = parse_color_view)]
        views: Vec<ColorView>,

        /// Default foreground for views that omit one.
        #[arg(short = 'f', long = "foreground", value_parser = parse_color)]
        foreground: Option<Color>,

        /// Default background for views that omit one.
        #[arg(short = 'b', long = "background", value_parser = parse_color)]
        background: Option<Color>,

        /// Default text for views that omit it.
        #[arg(short = 't', long = "text")]
        text: Option<String>,
    },

    /// View, activate, save, remove or list themes.
    ///
    /// Without a name the current terminal colors are shown; a name without
    /// flags shows that theme's colors.
    Theme {
        /// Theme name.
        #[arg(required_unless_present_any = ["deactivate", "list"])]
        theme_name: Option<String>,

        /// Deactivate the current temporary theme, restoring prior colors.
        #[arg(short = 'd', long = "deactivate")]
        deactivate: bool,

        /// List all saved themes.
        #[arg(short = 'l', long = "list")]
        list: bool,

        /// Delete the named theme.
        #[arg(short = 'r', long = "remove")]
        remove: bool,

        /// Activate the theme in this terminal.
        #[arg(short = 'a', long = "activate", conflicts_with = "save")]
        activate: bool,

        /// With --activate: include the theme in ~/.Xresources, or repoint
        /// $XTHEME_LINK_FILE at it when that variable is set.
        #[arg(short = 'p', long = "permanent", requires = "activate")]
        permanent: bool,

        /// Save the current terminal colors as the named theme.
        #[arg(short = 's', long = "save", conflicts_with = "activate")]
        save: bool,

        /// With --save: replace an existing theme file.
        #[arg(short = 'o', long = "overwrite", requires = "save")]
        overwrite: bool,
    },

    /// Set or view one color register.
    ///
    /// With only a color id, displays that color; with a hex code as well,
    /// sets the register for this session.
    Color {
        /// Color register index, 0-15.
        #[arg(required_unless_present = "reset", value_parser = parse_color_id)]
        color_id: Option<ColorIdentifier>,

        /// Hex color code to set.
        #[arg(value_parser = parse_color)]
        color: Option<Color>,

        /// Reset every customized color of this session to its default.
        #[arg(short = 'r', long = "reset")]
        reset: bool,

        /// Set or view inside the named theme instead of the live terminal.
        #[arg(short = 't', long = "theme-name", conflicts_with = "reset")]
        theme_name: Option<String>,
    },
}

/// One line of the `view` command: optional fg, bg and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorView {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub text: Option<String>,
}

fn parse_color(value: &str) -> Result<Color, String> {
    Color::parse(value).map_err(|e| e.to_string())
}

fn parse_color_id(value: &str) -> Result<ColorIdentifier, String> {
    let index = value
        .parse::<u8>()
        .map_err(|_| format!("`{value}` is not a valid color identifier"))?;
    ColorIdentifier::from_index(index).map_err(|e| e.to_string())
}

fn parse_color_view(value: &str) -> Result<ColorView, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return Err(format!("`{value}` has too many fields"));
    }
    let field = |i: usize| parts.get(i).copied().filter(|p| !p.is_empty());
    let color_field = |i: usize| field(i).map(parse_color).transpose();
    Ok(ColorView {
        foreground: color_field(0)?,
        background: color_field(1)?,
        text: field(2).map(str::to_string),
    })
}
