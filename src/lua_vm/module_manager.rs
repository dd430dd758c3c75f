// Module resolution: maps a module name to source text through an ordered
// list of search paths. A module runs at most once per state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct ModuleManager {
    search_paths: Vec<PathBuf>,
    loaded: HashSet<String>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            loaded: HashSet::new(),
        }
    }

    pub fn add_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    /// First `<path>/<name>.lua` that exists, in insertion order.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_paths {
            let candidate = dir.join(format!("{}.lua", name));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    pub fn mark_loaded(&mut self, name: &str) {
        self.loaded.insert(name.to_string());
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}
