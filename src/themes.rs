//! Theme persistence and activation.
//!
//! A theme is a named file in X-resource syntax holding one `*color<N>: #hex`
//! line per color, wrapped in the auto-generated marker block. Activation
//! applies the theme's colors to the live terminal through the layered view;
//! a permanent activation additionally wires the theme into the user's
//! resource file (or a configured symlink) and reloads the resource database,
//! while a temporary activation records the pre-activation palette in a
//! one-slot rollback file.

use crate::color::{Color, ColorIdentifier};
use crate::config::Config;
use crate::error::ThemeError;
use crate::resources;
use crate::term::TerminalColors;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ThemeContents
// ---------------------------------------------------------------------------

/// A theme's textual form paired with its parsed color map.
///
/// The two representations round-trip: serializing the map of a contents
/// built from colors and re-parsing it yields the same map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeContents {
    text: String,
    colors: BTreeMap<ColorIdentifier, Color>,
}

impl ThemeContents {
    /// Parse theme text, keeping the original text verbatim.
    ///
    /// Non-color resources and comments are ignored; `color<N>` entries with
    /// an index beyond the 4-bit range are skipped (256-color themes define
    /// them, this tool only manages the first 16). A color entry with an
    /// invalid hex value is a parse error.
    pub fn from_string(text: &str) -> Result<Self, ThemeError> {
        let mut colors = BTreeMap::new();
        for entry in resources::color_entries(text) {
            let Some(id) = u8::try_from(entry.index)
                .ok()
                .and_then(|i| ColorIdentifier::from_index(i).ok())
            else {
                tracing::debug!(index = entry.index, "skipping color outside the 4-bit range");
                continue;
            };
            let color = Color::parse(&entry.value)
                .map_err(|e| ThemeError::Parse(format!("{id}: {e}")))?;
            colors.insert(id, color);
        }
        Ok(Self {
            text: text.to_string(),
            colors,
        })
    }

    pub fn from_file(file: &Path) -> Result<Self, ThemeError> {
        let text =
            fs::read_to_string(file).map_err(|e| ThemeError::Io(file.to_path_buf(), e))?;
        Self::from_string(&text)
    }

    /// Build contents from a color map, serializing it to resource lines.
    pub fn from_colors(colors: &BTreeMap<ColorIdentifier, Color>) -> Self {
        Self {
            text: resources::serialize_colors(colors),
            colors: colors.clone(),
        }
    }

    pub fn colors(&self) -> &BTreeMap<ColorIdentifier, Color> {
        &self.colors
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

/// Theme directory operations plus permanent/temporary activation.
pub struct Themes {
    theme_dir: PathBuf,
    old_theme_file: PathBuf,
    xresources_file: PathBuf,
    link_file: Option<PathBuf>,
}

impl Themes {
    pub fn new(config: &Config) -> Self {
        Self::with_paths(
            config.theme_dir().to_path_buf(),
            config.old_theme_file().to_path_buf(),
            config.xresources_file().to_path_buf(),
            config.link_file().map(Path::to_path_buf),
        )
    }

    pub fn with_paths(
        theme_dir: PathBuf,
        old_theme_file: PathBuf,
        xresources_file: PathBuf,
        link_file: Option<PathBuf>,
    ) -> Self {
        Self {
            theme_dir,
            old_theme_file,
            xresources_file,
            link_file,
        }
    }

    /// Path of the named theme file, existing or not.
    pub fn path(&self, name: &str) -> PathBuf {
        self.theme_dir.join(name)
    }

    /// Load the named theme.
    pub fn contents(&self, name: &str) -> Result<ThemeContents, ThemeError> {
        let file = self.path(name);
        if !file.is_file() {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        ThemeContents::from_file(&file)
    }

    /// One color out of the named theme.
    pub fn color(&self, name: &str, id: ColorIdentifier) -> Result<Color, ThemeError> {
        self.contents(name)?
            .colors()
            .get(&id)
            .cloned()
            .ok_or_else(|| ThemeError::Parse(format!("theme `{name}` does not define {id}")))
    }

    /// Update one color inside the named theme file, rewriting it as a fresh
    /// auto-generated block.
    pub fn set_color(
        &self,
        name: &str,
        id: ColorIdentifier,
        color: Color,
    ) -> Result<(), ThemeError> {
        let mut colors = self.contents(name)?.colors().clone();
        colors.insert(id, color.clone());
        let text = resources::wrap_generated(&resources::serialize_colors(&colors));
        write_text(&self.path(name), &text)?;
        tracing::info!(theme = name, %id, %color, "updated theme color");
        Ok(())
    }

    /// Names of all saved themes, sorted.
    pub fn list(&self) -> Result<Vec<String>, ThemeError> {
        let entries = fs::read_dir(&self.theme_dir)
            .map_err(|e| ThemeError::Io(self.theme_dir.clone(), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ThemeError::Io(self.theme_dir.clone(), e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Save the currently visible palette as a named theme.
    ///
    /// Refuses to replace an existing theme unless `overwrite` is set. A
    /// failed write removes the partial file rather than leaving it behind.
    pub fn save(
        &self,
        term: &mut TerminalColors,
        name: &str,
        overwrite: bool,
    ) -> Result<(), ThemeError> {
        let file = self.path(name);
        if file.exists() && !overwrite {
            return Err(ThemeError::Exists(name.to_string()));
        }
        let body = resources::serialize_colors(&term.visible()?);
        let text = resources::wrap_generated(&body);
        if let Err(e) = fs::write(&file, &text) {
            if file.exists() {
                let _ = fs::remove_file(&file);
            }
            return Err(ThemeError::Io(file, e));
        }
        tracing::info!(theme = name, "saved terminal colors");
        Ok(())
    }

    /// Delete the named theme file.
    pub fn remove(&self, name: &str) -> Result<(), ThemeError> {
        let file = self.path(name);
        if !file.exists() {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        fs::remove_file(&file).map_err(|e| ThemeError::Io(file, e))?;
        tracing::info!(theme = name, "removed theme");
        Ok(())
    }

    /// Apply the named theme to the live terminal.
    ///
    /// A permanent activation wires the theme into the resource setup and
    /// clears the rollback slot; a temporary one records the pre-activation
    /// palette there so [`Themes::deactivate`] can restore it.
    pub fn activate(
        &self,
        term: &mut TerminalColors,
        name: &str,
        permanent: bool,
    ) -> Result<(), ThemeError> {
        let theme = self.contents(name)?;
        let previous = ThemeContents::from_colors(&term.visible()?);
        apply_colors(term, &theme)?;
        tracing::info!(theme = name, permanent, "activated theme in terminal");

        if permanent {
            if let Some(link) = &self.link_file {
                swap_link(link, &self.path(name))?;
                term.backend()
                    .reload_resources(&self.xresources_file, None)
                    .map_err(ThemeError::Reload)?;
            } else {
                self.include_in_resources(name)?;
                term.backend()
                    .reload_resources(&self.xresources_file, Some(&self.theme_dir))
                    .map_err(ThemeError::Reload)?;
            }
            write_text(&self.old_theme_file, "")?;
        } else {
            write_text(&self.old_theme_file, previous.text())?;
        }
        Ok(())
    }

    /// Undo a temporary activation by reapplying the recorded palette.
    ///
    /// An empty (or absent) rollback slot means nothing was temporarily
    /// activated and this is a no-op.
    pub fn deactivate(&self, term: &mut TerminalColors) -> Result<(), ThemeError> {
        let rollback = if self.old_theme_file.exists() {
            ThemeContents::from_file(&self.old_theme_file)?
        } else {
            ThemeContents::from_colors(&BTreeMap::new())
        };
        apply_colors(term, &rollback)?;
        write_text(&self.old_theme_file, "")?;
        if !rollback.colors().is_empty() {
            tracing::info!("deactivated temporary theme");
        }
        Ok(())
    }

    /// Rewrite the user's resource file so its auto-generated block includes
    /// the named theme, keeping a backup of the previous file.
    fn include_in_resources(&self, name: &str) -> Result<(), ThemeError> {
        if !self.path(name).is_file() {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        let original = fs::read_to_string(&self.xresources_file)
            .map_err(|e| ThemeError::Io(self.xresources_file.clone(), e))?;
        let updated =
            resources::replace_generated(&original, &resources::include_statement(name));

        // Stage the new contents next to the original, keep the original
        // under a backup name, then move the staged file into place.
        let staged = unique_sibling(&self.xresources_file, "out");
        write_text(&staged, &updated)?;
        let backup = unique_sibling(&self.xresources_file, "backup");
        fs::rename(&self.xresources_file, &backup)
            .map_err(|e| ThemeError::Io(self.xresources_file.clone(), e))?;
        fs::rename(&staged, &self.xresources_file)
            .map_err(|e| ThemeError::Io(self.xresources_file.clone(), e))?;
        tracing::info!(
            file = %self.xresources_file.display(),
            backup = %backup.display(),
            "rewrote resource file include block"
        );
        Ok(())
    }
}

/// Bulk-set every color of `theme` through the layered view.
fn apply_colors(term: &mut TerminalColors, theme: &ThemeContents) -> Result<(), ThemeError> {
    for (id, color) in theme.colors() {
        term.set(*id, color.clone())?;
    }
    Ok(())
}

/// Atomically repoint `link` at `target` via a staged sibling symlink.
fn swap_link(link: &Path, target: &Path) -> Result<(), ThemeError> {
    let staged = unique_sibling(link, "new");
    std::os::unix::fs::symlink(target, &staged)
        .map_err(|e| ThemeError::Io(staged.clone(), e))?;
    if let Err(e) = fs::rename(&staged, link) {
        let _ = fs::remove_file(&staged);
        return Err(ThemeError::Io(link.to_path_buf(), e));
    }
    tracing::info!(link = %link.display(), target = %target.display(), "updated theme link");
    Ok(())
}

/// A path next to `file` with a `.{tag}` suffix that does not exist yet.
fn unique_sibling(file: &Path, tag: &str) -> PathBuf {
    let base = format!("{}.{tag}", file.display());
    let mut candidate = PathBuf::from(&base);
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{base}{counter}"));
        counter += 1;
    }
    candidate
}

fn write_text(path: &Path, text: &str) -> Result<(), ThemeError> {
    fs::write(path, text).map_err(|e| ThemeError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::CustomColors;
    use crate::testsupport::{FakeBackend, TestTempDir};
    use std::rc::Rc;

    fn id(index: u8) -> ColorIdentifier {
        ColorIdentifier::from_index(index).unwrap()
    }

    fn color(hex: &str) -> Color {
        Color::parse(hex).unwrap()
    }

    struct Fixture {
        dir: TestTempDir,
        themes: Themes,
        term: TerminalColors,
        backend: Rc<FakeBackend>,
    }

    fn fixture(link_file: bool) -> Fixture {
        let dir = TestTempDir::new("themes");
        fs::create_dir_all(dir.child("themes")).unwrap();
        dir.write_text("xresources", "XTerm*font: fixed\n");
        let themes = Themes::with_paths(
            dir.child("themes"),
            dir.child("old_theme"),
            dir.child("xresources"),
            link_file.then(|| dir.child("theme_link")),
        );
        let backend = Rc::new(FakeBackend::with_palette(&[
            (0, "#000000"),
            (1, "#aa0000"),
            (2, "#00aa00"),
        ]));
        let custom = CustomColors::load(dir.child("custom"), "w0.0").unwrap();
        let term = TerminalColors::new(Box::new(Rc::clone(&backend)), custom);
        Fixture {
            dir,
            themes,
            term,
            backend,
        }
    }

    #[test]
    fn contents_round_trip_through_text() {
        let mut colors = BTreeMap::new();
        colors.insert(id(0), color("#000000"));
        colors.insert(id(15), color("#ffffff"));
        let contents = ThemeContents::from_colors(&colors);
        let reparsed = ThemeContents::from_string(contents.text()).unwrap();
        assert_eq!(reparsed.colors(), &colors);
    }

    #[test]
    fn contents_skip_indices_beyond_the_palette() {
        let contents =
            ThemeContents::from_string("*color0: #000000\n*color231: #ffd7af\n").unwrap();
        assert_eq!(contents.colors().len(), 1);
        assert_eq!(contents.colors().get(&id(0)), Some(&color("#000000")));
    }

    #[test]
    fn contents_reject_invalid_hex_values() {
        let err = ThemeContents::from_string("*color0: notahex\n").expect_err("must fail");
        assert!(matches!(err, ThemeError::Parse(_)), "got: {err}");
    }

    #[test]
    fn save_wraps_visible_palette_in_marker_block() {
        let mut fx = fixture(false);
        fx.themes.save(&mut fx.term, "mono", false).unwrap();
        let text = fs::read_to_string(fx.themes.path("mono")).unwrap();
        assert!(text.starts_with(resources::GENERATED_HEADER));
        assert!(text.trim_end().ends_with(resources::GENERATED_FOOTER));
        assert!(text.contains("*color1: #aa0000"));
    }

    #[test]
    fn save_refuses_to_overwrite_without_the_flag() {
        let mut fx = fixture(false);
        fx.themes.save(&mut fx.term, "mono", false).unwrap();
        let err = fx
            .themes
            .save(&mut fx.term, "mono", false)
            .expect_err("must fail");
        assert!(matches!(err, ThemeError::Exists(_)), "got: {err}");
        // With the flag the save goes through.
        fx.themes.save(&mut fx.term, "mono", true).unwrap();
    }

    #[test]
    fn list_returns_sorted_theme_names() {
        let mut fx = fixture(false);
        fx.themes.save(&mut fx.term, "zebra", false).unwrap();
        fx.themes.save(&mut fx.term, "aurora", false).unwrap();
        assert_eq!(fx.themes.list().unwrap(), vec!["aurora", "zebra"]);
    }

    #[test]
    fn remove_deletes_and_reports_missing() {
        let mut fx = fixture(false);
        fx.themes.save(&mut fx.term, "mono", false).unwrap();
        fx.themes.remove("mono").unwrap();
        assert!(!fx.themes.path("mono").exists());
        let err = fx.themes.remove("mono").expect_err("must fail");
        assert!(matches!(err, ThemeError::NotFound(_)), "got: {err}");
    }

    #[test]
    fn temporary_activation_records_rollback_and_deactivate_restores() {
        let mut fx = fixture(false);
        fx.dir
            .write_text("themes/night", "*color0: #111111\n*color1: #222222\n");

        fx.themes.activate(&mut fx.term, "night", false).unwrap();
        assert_eq!(fx.term.get(id(0)).unwrap(), color("#111111"));
        assert_eq!(fx.term.get(id(1)).unwrap(), color("#222222"));
        let rollback = fs::read_to_string(fx.dir.child("old_theme")).unwrap();
        assert!(rollback.contains("*color0: #000000"));

        fx.themes.deactivate(&mut fx.term).unwrap();
        assert_eq!(fx.term.get(id(0)).unwrap(), color("#000000"));
        assert_eq!(fx.term.get(id(1)).unwrap(), color("#aa0000"));
        assert_eq!(fs::read_to_string(fx.dir.child("old_theme")).unwrap(), "");
    }

    #[test]
    fn deactivate_without_prior_activation_is_a_noop() {
        let mut fx = fixture(false);
        fx.themes.deactivate(&mut fx.term).unwrap();
        assert_eq!(fx.term.get(id(0)).unwrap(), color("#000000"));
        assert!(fx.backend.set_calls().is_empty());
    }

    #[test]
    fn permanent_activation_rewrites_resources_and_reloads() {
        let mut fx = fixture(false);
        fx.dir.write_text("themes/night", "*color0: #111111\n");
        fx.themes.activate(&mut fx.term, "night", true).unwrap();

        let resources_text = fs::read_to_string(fx.dir.child("xresources")).unwrap();
        assert!(resources_text.starts_with("XTerm*font: fixed\n"));
        assert!(resources_text.contains("#include \"night\""));
        assert!(fx.dir.child("xresources.backup").exists());

        let reloads = fx.backend.reloads();
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].0, fx.dir.child("xresources"));
        assert_eq!(reloads[0].1.as_deref(), Some(fx.dir.child("themes").as_path()));
        // Permanent activation clears the rollback slot.
        assert_eq!(fs::read_to_string(fx.dir.child("old_theme")).unwrap(), "");
    }

    #[test]
    fn permanent_activation_twice_keeps_one_include_block() {
        let mut fx = fixture(false);
        fx.dir.write_text("themes/night", "*color0: #111111\n");
        fx.dir.write_text("themes/day", "*color0: #eeeeee\n");
        fx.themes.activate(&mut fx.term, "night", true).unwrap();
        fx.themes.activate(&mut fx.term, "day", true).unwrap();

        let text = fs::read_to_string(fx.dir.child("xresources")).unwrap();
        assert!(!text.contains("night"));
        assert_eq!(text.matches(resources::GENERATED_HEADER).count(), 1);
        assert!(text.contains("#include \"day\""));
    }

    #[test]
    fn permanent_activation_with_link_file_swaps_the_symlink() {
        let mut fx = fixture(true);
        fx.dir.write_text("themes/night", "*color0: #111111\n");
        fx.themes.activate(&mut fx.term, "night", true).unwrap();

        let target = fs::read_link(fx.dir.child("theme_link")).unwrap();
        assert_eq!(target, fx.themes.path("night"));
        // The resource file itself is untouched in link mode.
        assert_eq!(
            fs::read_to_string(fx.dir.child("xresources")).unwrap(),
            "XTerm*font: fixed\n"
        );
        let reloads = fx.backend.reloads();
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].1, None);
    }

    #[test]
    fn activating_a_missing_theme_fails_before_touching_state() {
        let mut fx = fixture(false);
        let err = fx
            .themes
            .activate(&mut fx.term, "ghost", false)
            .expect_err("must fail");
        assert!(matches!(err, ThemeError::NotFound(_)), "got: {err}");
        assert!(fx.backend.set_calls().is_empty());
        assert!(!fx.dir.child("old_theme").exists());
    }

    #[test]
    fn set_color_updates_the_theme_file_in_place() {
        let fx = fixture(false);
        fx.dir.write_text("themes/night", "*color0: #111111\n");
        fx.themes.set_color("night", id(1), color("#222222")).unwrap();

        let contents = fx.themes.contents("night").unwrap();
        assert_eq!(contents.colors().get(&id(0)), Some(&color("#111111")));
        assert_eq!(contents.colors().get(&id(1)), Some(&color("#222222")));
        let text = fs::read_to_string(fx.themes.path("night")).unwrap();
        assert!(text.starts_with(resources::GENERATED_HEADER));
    }

    #[test]
    fn theme_scoped_color_lookup() {
        let fx = fixture(false);
        fx.dir.write_text("themes/night", "*color2: #333333\n");
        assert_eq!(fx.themes.color("night", id(2)).unwrap(), color("#333333"));
        assert!(fx.themes.color("night", id(3)).is_err());
    }
}
