use std::{path::Path, sync::Arc};

use crate::{
    foundation::error::{ReeltimeError, ReeltimeResult},
    io::{
        reader::{IoOptions, MediaReader, ReadPlugin},
        sequence::SequencePlugin,
    },
};

/// Registry of [`ReadPlugin`]s, dispatching by file extension.
///
/// Later registrations win over earlier ones for a shared extension.
#[derive(Default)]
pub struct IoSystem {
    plugins: Vec<Arc<dyn ReadPlugin>>,
}

impl IoSystem {
    /// Registry without plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the file-backed plugins.
    ///
    /// The procedural [`crate::MemoryPlugin`] is never registered here; add it with
    /// [`IoSystem::register`].
    pub fn with_defaults() -> Self {
        let mut io = Self::new();
        io.register(Arc::new(SequencePlugin));
        io
    }

    /// Add `plugin`; it takes precedence over earlier plugins for shared extensions.
    pub fn register(&mut self, plugin: Arc<dyn ReadPlugin>) {
        tracing::debug!(plugin = plugin.name(), extensions = ?plugin.extensions(), "register read plugin");
        self.plugins.push(plugin);
    }

    /// Plugin handling `path`, matched on its lower-case extension.
    pub fn plugin_for(&self, path: &Path) -> Option<&Arc<dyn ReadPlugin>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.plugins
            .iter()
            .rev()
            .find(|p| p.extensions().iter().any(|e| *e == ext))
    }

    /// Open a reader for `path`.
    pub fn read(&self, path: &Path, options: &IoOptions) -> ReeltimeResult<Arc<dyn MediaReader>> {
        let plugin = self.plugin_for(path).ok_or_else(|| {
            ReeltimeError::io(format!("no read plugin for '{}'", path.display()))
        })?;
        plugin.read(path, options)
    }

    /// Every extension some plugin can read.
    pub fn extensions(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .plugins
            .iter()
            .flat_map(|p| p.extensions().iter().map(|e| (*e).to_string()))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

impl std::fmt::Debug for IoSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoSystem")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/system.rs"]
mod tests;
