//! Shared test fixtures for the color-engine test modules.
//!
//! Keeping the fake backend and temp-dir helper here prevents each test module
//! from rebuilding ad-hoc fixture code.

use crate::backend::ResourceBackend;
use crate::error::ProcessError;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
///
/// Intentionally simple and std-only so unit tests can use it without pulling
/// the integration-test dependencies into the library.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("xthematic-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// One recorded hardware color-set invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCall {
    pub index: u8,
    pub rgb: (u32, u32, u32),
}

/// In-memory stand-in for the X resource database and terminal hardware.
///
/// Register writes are recorded but deliberately do not feed back into the
/// query text, mirroring the real asymmetry: `tput initc` changes a register,
/// not the resource database.
#[derive(Debug, Default)]
pub struct FakeBackend {
    resources: RefCell<String>,
    set_calls: RefCell<Vec<SetCall>>,
    reloads: RefCell<Vec<(PathBuf, Option<PathBuf>)>>,
    query_count: Cell<u64>,
    fail_queries: Cell<bool>,
    fail_sets: Cell<bool>,
}

impl FakeBackend {
    /// Backend whose resource database contains exactly `resources`.
    pub fn new(resources: &str) -> Self {
        Self {
            resources: RefCell::new(resources.to_string()),
            ..Self::default()
        }
    }

    /// Backend seeded with `*color<N>` entries in `xrdb -query` line format.
    pub fn with_palette(palette: &[(u8, &str)]) -> Self {
        let mut text = String::new();
        for (index, hex) in palette {
            text.push_str(&format!("*color{index}:\t{hex}\n"));
        }
        Self::new(&text)
    }

    /// Replace the resource database text, as an external tool would.
    pub fn set_resources(&self, text: &str) {
        *self.resources.borrow_mut() = text.to_string();
    }

    pub fn set_calls(&self) -> Vec<SetCall> {
        self.set_calls.borrow().clone()
    }

    pub fn reloads(&self) -> Vec<(PathBuf, Option<PathBuf>)> {
        self.reloads.borrow().clone()
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.get()
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.set(fail);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.set(fail);
    }
}

impl ResourceBackend for FakeBackend {
    fn query_resources(&self) -> Result<String, ProcessError> {
        self.query_count.set(self.query_count.get() + 1);
        if self.fail_queries.get() {
            return Err(ProcessError::Status {
                program: "xrdb".into(),
                code: Some(1),
                stderr: "simulated query failure".into(),
            });
        }
        Ok(self.resources.borrow().clone())
    }

    fn reload_resources(
        &self,
        file: &Path,
        include_dir: Option<&Path>,
    ) -> Result<(), ProcessError> {
        self.reloads
            .borrow_mut()
            .push((file.to_path_buf(), include_dir.map(Path::to_path_buf)));
        Ok(())
    }

    fn set_register(&self, index: u8, rgb: (u32, u32, u32)) -> Result<(), ProcessError> {
        if self.fail_sets.get() {
            return Err(ProcessError::Status {
                program: "tput".into(),
                code: Some(1),
                stderr: "simulated initc failure".into(),
            });
        }
        self.set_calls.borrow_mut().push(SetCall { index, rgb });
        Ok(())
    }
}

// Lets tests hold onto the fake while the engine owns a boxed handle to it.
impl ResourceBackend for Rc<FakeBackend> {
    fn query_resources(&self) -> Result<String, ProcessError> {
        self.as_ref().query_resources()
    }

    fn reload_resources(
        &self,
        file: &Path,
        include_dir: Option<&Path>,
    ) -> Result<(), ProcessError> {
        self.as_ref().reload_resources(file, include_dir)
    }

    fn set_register(&self, index: u8, rgb: (u32, u32, u32)) -> Result<(), ProcessError> {
        self.as_ref().set_register(index, rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    }

    #[test]
    fn fake_backend_palette_matches_query_line_format() {
        let backend = FakeBackend::with_palette(&[(0, "#000000"), (15, "#ffffff")]);
        let text = backend.query_resources().unwrap();
        assert!(text.contains("*color0:\t#000000"));
        assert!(text.contains("*color15:\t#ffffff"));
        assert_eq!(backend.query_count(), 1);
    }

    #[test]
    fn fake_backend_records_register_writes_without_touching_resources() {
        let backend = FakeBackend::with_palette(&[(0, "#000000")]);
        backend.set_register(0, (996, 996, 996)).unwrap();
        assert_eq!(
            backend.set_calls(),
            vec![SetCall {
                index: 0,
                rgb: (996, 996, 996)
            }]
        );
        assert!(backend.query_resources().unwrap().contains("#000000"));
    }
}
