//! The layered terminal-color engine.
//!
//! Three independently-mutable sources of truth are reconciled here:
//!
//! - [`LoadedColors`]: what the X resource database says the palette is,
//!   cached and invalidated by a content fingerprint of `xrdb -query` output.
//! - [`CustomColors`]: this session's deviations from those defaults, persisted
//!   in a JSON document shared by all sessions.
//! - [`TerminalColors`]: the composed view. Reads resolve custom over loaded;
//!   writes reprogram the hardware register and then promote the value into
//!   (or demote it out of) the custom layer.
//!
//! Everything is owned and threaded explicitly; there is no process-wide state.

use crate::backend::ResourceBackend;
use crate::color::{Color, ColorIdentifier};
use crate::error::{StoreError, TermError};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ColorLayer
// ---------------------------------------------------------------------------

/// Read-only lookup capability over one color layer.
pub trait ColorLayer {
    fn lookup(&self, id: ColorIdentifier) -> Option<&Color>;

    fn contains(&self, id: ColorIdentifier) -> bool {
        self.lookup(id).is_some()
    }

    /// Defined identifiers, in index order.
    fn identifiers(&self) -> Vec<ColorIdentifier>;
}

/// Union of two layers where the overlay shadows the base.
pub struct LayeredLookup<'a> {
    overlay: &'a dyn ColorLayer,
    base: &'a dyn ColorLayer,
}

impl<'a> LayeredLookup<'a> {
    pub fn new(overlay: &'a dyn ColorLayer, base: &'a dyn ColorLayer) -> Self {
        Self { overlay, base }
    }

    pub fn get(&self, id: ColorIdentifier) -> Option<&'a Color> {
        self.overlay.lookup(id).or_else(|| self.base.lookup(id))
    }

    pub fn contains(&self, id: ColorIdentifier) -> bool {
        self.overlay.contains(id) || self.base.contains(id)
    }

    pub fn identifiers(&self) -> Vec<ColorIdentifier> {
        let mut ids = self.overlay.identifiers();
        ids.extend(self.base.identifiers());
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

// ---------------------------------------------------------------------------
// LoadedColors
// ---------------------------------------------------------------------------

/// Cache of the palette defined in the X resource database.
///
/// Reads are lazy: before answering, a fresh fingerprint of `xrdb -query`
/// output is compared against the stored one and the cache refreshes on
/// mismatch. This bounds cost to one external query per access burst while
/// tolerating changes made by other tools between accesses. A refresh failure
/// is propagated even when older cached data exists (fail-fast; serving stale
/// defaults would silently misdrive promotion/demotion decisions).
#[derive(Debug, Default)]
pub struct LoadedColors {
    colors: BTreeMap<ColorIdentifier, Color>,
    fingerprint: Option<u64>,
}

impl LoadedColors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-query the resource database and rebuild the cached palette.
    pub fn refresh(&mut self, backend: &dyn ResourceBackend) -> Result<(), TermError> {
        let raw = backend
            .query_resources()
            .map_err(|e| TermError::CacheRefresh(e.to_string()))?;
        self.colors = parse_loaded(&raw)?;
        self.fingerprint = Some(fingerprint(&raw));
        tracing::debug!(colors = self.colors.len(), "refreshed loaded colors");
        Ok(())
    }

    /// Refresh if the external source changed since the last refresh.
    fn sync(&mut self, backend: &dyn ResourceBackend) -> Result<(), TermError> {
        if self.is_outdated(backend)? {
            self.refresh(backend)?;
        }
        Ok(())
    }

    fn is_outdated(&self, backend: &dyn ResourceBackend) -> Result<bool, TermError> {
        let Some(stored) = self.fingerprint else {
            return Ok(true);
        };
        let raw = backend
            .query_resources()
            .map_err(|e| TermError::CacheRefresh(e.to_string()))?;
        Ok(fingerprint(&raw) != stored)
    }

    /// Read-through get: synchronizes with the external source first.
    pub fn get(
        &mut self,
        backend: &dyn ResourceBackend,
        id: ColorIdentifier,
    ) -> Result<Option<Color>, TermError> {
        self.sync(backend)?;
        Ok(self.colors.get(&id).cloned())
    }

    /// Read-through view of the whole cached palette.
    pub fn colors(
        &mut self,
        backend: &dyn ResourceBackend,
    ) -> Result<&BTreeMap<ColorIdentifier, Color>, TermError> {
        self.sync(backend)?;
        Ok(&self.colors)
    }

    pub fn len(
        &mut self,
        backend: &dyn ResourceBackend,
    ) -> Result<usize, TermError> {
        self.sync(backend)?;
        Ok(self.colors.len())
    }

    /// Cached value without consulting the external source.
    fn cached(&self, id: ColorIdentifier) -> Option<&Color> {
        self.colors.get(&id)
    }
}

// `lookup` reads the cache as-is; freshness is the composing owner's job.
impl ColorLayer for LoadedColors {
    fn lookup(&self, id: ColorIdentifier) -> Option<&Color> {
        self.colors.get(&id)
    }

    fn identifiers(&self) -> Vec<ColorIdentifier> {
        self.colors.keys().copied().collect()
    }
}

/// Parse `xrdb -query` output into the loaded palette.
///
/// Duplicate indices with differing values are fatal: the resource database
/// cannot name two colors for one register.
fn parse_loaded(raw: &str) -> Result<BTreeMap<ColorIdentifier, Color>, TermError> {
    let mut colors = BTreeMap::new();
    for entry in crate::resources::color_entries(raw) {
        let index = u8::try_from(entry.index)
            .ok()
            .and_then(|i| ColorIdentifier::from_index(i).ok())
            .ok_or_else(|| {
                TermError::CacheRefresh(format!(
                    "color{} is outside the 4-bit register range",
                    entry.index
                ))
            })?;
        let color = Color::parse(&entry.value).map_err(|e| {
            TermError::CacheRefresh(format!("bad value for {index}: {e}"))
        })?;
        if let Some(existing) = colors.get(&index) {
            if *existing != color {
                return Err(TermError::CacheRefresh(format!(
                    "{index} has more than one value"
                )));
            }
        }
        colors.insert(index, color);
    }
    Ok(colors)
}

/// Content fingerprint of the raw query output.
fn fingerprint(raw: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    raw.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// CustomColors
// ---------------------------------------------------------------------------

/// On-disk shape of the shared custom-colors document:
/// session id → stringified color index → hex code.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Document {
    sessions: BTreeMap<String, BTreeMap<String, String>>,
}

/// Session-scoped persistent color overrides.
///
/// All sessions share one JSON document, so every mutation re-reads the full
/// document, rewrites only this session's sub-map, and replaces the file
/// wholesale. There is no locking: concurrent writers race with last-write-wins
/// semantics, never a torn file, because the replace is a tmp-file rename.
/// The in-memory map changes only after the disk write succeeds.
#[derive(Debug)]
pub struct CustomColors {
    session_id: String,
    file: PathBuf,
    colors: BTreeMap<ColorIdentifier, Color>,
}

impl CustomColors {
    /// Load this session's overrides from the shared document.
    ///
    /// A missing file or absent session entry yields an empty override set.
    pub fn load(file: PathBuf, session_id: impl Into<String>) -> Result<Self, TermError> {
        let session_id = session_id.into();
        let mut store = Self {
            session_id,
            file,
            colors: BTreeMap::new(),
        };
        let document = store.read_document()?;
        if let Some(entries) = document.sessions.get(&store.session_id) {
            for (index, hex) in entries {
                let id = index
                    .parse::<u8>()
                    .ok()
                    .and_then(|i| ColorIdentifier::from_index(i).ok())
                    .ok_or_else(|| {
                        TermError::Invariant(format!(
                            "custom colors document holds invalid index `{index}`"
                        ))
                    })?;
                let color = Color::parse(hex).map_err(|e| {
                    TermError::Invariant(format!("custom colors document holds {e}"))
                })?;
                store.colors.insert(id, color);
            }
        }
        tracing::debug!(
            session = %store.session_id,
            overrides = store.colors.len(),
            "loaded custom colors"
        );
        Ok(store)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn get(&self, id: ColorIdentifier) -> Option<&Color> {
        self.colors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &BTreeMap<ColorIdentifier, Color> {
        &self.colors
    }

    /// Record an override for this session, persisting before mutating memory.
    pub fn set(&mut self, id: ColorIdentifier, color: Color) -> Result<(), TermError> {
        let mut document = self.read_document()?;
        document
            .sessions
            .entry(self.session_id.clone())
            .or_default()
            .insert(id.index().to_string(), color.hex().to_string());
        self.write_document(&document)?;
        tracing::info!(%id, %color, "set custom color");
        self.colors.insert(id, color);
        Ok(())
    }

    /// Remove an override, verifying disk and memory still agree on its value.
    pub fn remove(&mut self, id: ColorIdentifier) -> Result<(), TermError> {
        let expected = self
            .colors
            .get(&id)
            .ok_or_else(|| {
                TermError::Invariant(format!("no custom override recorded for {id}"))
            })?
            .clone();
        let mut document = self.read_document()?;
        let entries = document.sessions.entry(self.session_id.clone()).or_default();
        match entries.remove(&id.index().to_string()) {
            Some(on_disk) if Color::parse(&on_disk).ok().as_ref() == Some(&expected) => {}
            other => {
                return Err(TermError::Invariant(format!(
                    "custom override for {id} diverged between memory ({expected}) and disk ({other:?})"
                )));
            }
        }
        self.write_document(&document)?;
        tracing::info!(%id, color = %expected, "removed custom color");
        self.colors.remove(&id);
        Ok(())
    }

    /// Drop every override recorded for this session.
    pub fn reset(&mut self) -> Result<(), TermError> {
        let mut document = self.read_document()?;
        document.sessions.remove(&self.session_id);
        self.write_document(&document)?;
        tracing::info!(session = %self.session_id, "reset custom colors");
        self.colors.clear();
        Ok(())
    }

    fn read_document(&self) -> Result<Document, TermError> {
        if !self.file.exists() {
            return Ok(Document::default());
        }
        let raw = fs::read_to_string(&self.file)
            .map_err(|e| StoreError::Io(self.file.clone(), e))?;
        if raw.trim().is_empty() {
            return Ok(Document::default());
        }
        let document = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Json(self.file.clone(), e))?;
        Ok(document)
    }

    fn write_document(&self, document: &Document) -> Result<(), TermError> {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Json(self.file.clone(), e))?;
        // Stage in a sibling file and rename so a failed write can never leave
        // a torn document behind.
        let tmp = self.file.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.file).map_err(|e| StoreError::Io(self.file.clone(), e))?;
        Ok(())
    }
}

impl ColorLayer for CustomColors {
    fn lookup(&self, id: ColorIdentifier) -> Option<&Color> {
        self.colors.get(&id)
    }

    fn identifiers(&self) -> Vec<ColorIdentifier> {
        self.colors.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// TerminalColors
// ---------------------------------------------------------------------------

/// The composed, mutable view of the live terminal palette.
pub struct TerminalColors {
    loaded: LoadedColors,
    custom: CustomColors,
    backend: Box<dyn ResourceBackend>,
}

impl TerminalColors {
    pub fn new(backend: Box<dyn ResourceBackend>, custom: CustomColors) -> Self {
        Self {
            loaded: LoadedColors::new(),
            custom,
            backend,
        }
    }

    pub fn backend(&self) -> &dyn ResourceBackend {
        self.backend.as_ref()
    }

    pub fn custom(&self) -> &CustomColors {
        &self.custom
    }

    /// Resolve a color through the layers: custom overrides shadow loaded
    /// defaults.
    pub fn get(&mut self, id: ColorIdentifier) -> Result<Color, TermError> {
        self.loaded.sync(self.backend.as_ref())?;
        LayeredLookup::new(&self.custom, &self.loaded)
            .get(id)
            .cloned()
            .ok_or(TermError::UnknownIdentifier(id))
    }

    /// Every currently-defined identifier with its visible color.
    pub fn visible(&mut self) -> Result<BTreeMap<ColorIdentifier, Color>, TermError> {
        self.loaded.sync(self.backend.as_ref())?;
        let view = LayeredLookup::new(&self.custom, &self.loaded);
        let mut colors = BTreeMap::new();
        for id in view.identifiers() {
            if let Some(color) = view.get(id) {
                colors.insert(id, color.clone());
            }
        }
        Ok(colors)
    }

    /// Lowest identifier whose visible color equals `color`, if any.
    pub fn identifier_of(&mut self, color: &Color) -> Result<Option<ColorIdentifier>, TermError> {
        let visible = self.visible()?;
        Ok(visible
            .into_iter()
            .find(|(_, c)| c == color)
            .map(|(id, _)| id))
    }

    /// Set one terminal color, keeping hardware and override state in step.
    ///
    /// Setting the currently-visible value is a no-op with no hardware call.
    /// Otherwise the register is reprogrammed and the override layer updated:
    /// a value equal to the loaded default demotes (removes) the override,
    /// anything else promotes into (or updates) the override layer.
    ///
    /// The demotion comparison uses the *cached* loaded value without a
    /// refresh: a hardware register write does not change the resource
    /// database, so the cache deliberately keeps describing the defaults the
    /// override layer deviates from.
    pub fn set(&mut self, id: ColorIdentifier, color: Color) -> Result<(), TermError> {
        match self.get(id) {
            Ok(current) if current == color => {
                tracing::debug!(%id, %color, "already set; skipping hardware write");
                return Ok(());
            }
            Ok(_) => {}
            // An identifier absent from both layers can still be programmed;
            // the write below records it as an override.
            Err(TermError::UnknownIdentifier(_)) => {}
            Err(e) => return Err(e),
        }

        self.backend
            .set_register(id.index(), color.large_percentage())
            .map_err(|e| TermError::SetColor {
                id,
                detail: e.to_string(),
            })?;
        tracing::info!(%id, %color, "set terminal color");

        let matches_loaded = self.loaded.cached(id) == Some(&color);
        if matches_loaded {
            if self.custom.contains(id) {
                self.custom.remove(id)?;
            } else {
                // The visible value differed from `color` (step 1) yet no
                // override explains the difference from the loaded default.
                return Err(TermError::Invariant(format!(
                    "{color} matches the loaded value for {id}, but no custom override was recorded"
                )));
            }
        } else {
            self.custom.set(id, color)?;
        }
        Ok(())
    }

    /// Restore every overridden identifier to its loaded default, one demotion
    /// at a time.
    pub fn reset_customized(&mut self) -> Result<(), TermError> {
        let overridden = self.custom.identifiers();
        for id in overridden {
            let Some(default) = self.loaded.get(self.backend.as_ref(), id)? else {
                tracing::warn!(%id, "override has no loaded default; leaving register as-is");
                continue;
            };
            self.set(id, default)?;
        }
        Ok(())
    }
}
