//! Command registry built from a functions directory
//!
//! The registry owns every loaded unit for the duration of one run. It is
//! never patched incrementally: [`CommandRegistry::refresh`] throws every
//! unit away and loads the directory again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::command::Command;
use super::loader::PluginLoader;
use super::PluginError;

/// File extensions recognized as command units
pub const UNIT_EXTENSIONS: &[&str] = &["wasm", "wat"];

/// Derive the command name for a unit file, or `None` if the file is not a unit
pub fn unit_name(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !UNIT_EXTENSIONS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Unit files in a directory, sorted by file name
fn scan_units(dir: &Path) -> Result<Vec<(String, PathBuf)>, PluginError> {
    let mut units = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = unit_name(&path) {
            units.push((name, path));
        }
    }

    // Sorting by file name makes the shadowing rule deterministic
    units.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(units)
}

/// List the command names available in a functions directory.
///
/// Names starting with `__` are treated as private and left out. Unlike
/// [`CommandRegistry::build`], a missing directory is an error here.
pub fn list_functions(dir: &Path) -> Result<Vec<String>, PluginError> {
    let mut names: Vec<String> = scan_units(dir)?
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| !name.starts_with("__"))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Mapping from command name to loaded command
pub struct CommandRegistry {
    /// Loaded commands by name
    commands: HashMap<String, Box<dyn Command>>,

    /// Directory the registry was built from
    dir: PathBuf,
}

impl CommandRegistry {
    /// An empty registry not backed by any unit files
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            commands: HashMap::new(),
            dir: dir.into(),
        }
    }

    /// Load every unit in `dir`.
    ///
    /// Never fails: a missing directory yields an empty registry and a unit
    /// that fails to load is reported and skipped. When two files derive the
    /// same name, the one whose file name sorts last wins.
    pub fn build(dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(dir);
        registry.load_all();
        registry
    }

    /// Drop every loaded command and load the directory again
    pub fn refresh(&mut self) {
        self.commands.clear();
        self.load_all();
    }

    fn load_all(&mut self) {
        if !self.dir.exists() {
            tracing::warn!(dir = %self.dir.display(), "functions directory not found");
            return;
        }

        let units = match scan_units(&self.dir) {
            Ok(units) => units,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to scan functions directory");
                return;
            }
        };

        let loader = PluginLoader::new();
        for (name, path) in units {
            match loader.load(&path, &name) {
                Ok(command) => {
                    tracing::debug!(command = %name, path = %path.display(), "loaded command");
                    self.insert(name, command);
                }
                Err(e) => {
                    tracing::warn!(command = %name, error = %e, "failed to load command");
                }
            }
        }
    }

    /// Register a command, replacing any previous command of the same name
    pub fn insert(&mut self, name: impl Into<String>, command: impl Command + 'static) {
        let name = name.into();
        if self.commands.contains_key(&name) {
            tracing::warn!(command = %name, "command shadows an earlier unit of the same name");
        }
        self.commands.insert(name, Box::new(command));
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Command + 'static)> {
        self.commands.get_mut(name).map(|c| c.as_mut())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("dir", &self.dir)
            .field("commands", &self.names())
            .finish()
    }
}
