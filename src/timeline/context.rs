use std::sync::Arc;

use crate::io::system::IoSystem;

/// Services shared by timelines: the reader registry.
#[derive(Clone, Debug)]
pub struct Context {
    io: Arc<IoSystem>,
}

impl Context {
    /// Context reading through `io`.
    pub fn new(io: IoSystem) -> Self {
        Self { io: Arc::new(io) }
    }

    /// Reader plugin registry.
    pub fn io(&self) -> &Arc<IoSystem> {
        &self.io
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(IoSystem::with_defaults())
    }
}
