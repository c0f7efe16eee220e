pub(crate) mod cache;
pub(crate) mod memory;
pub(crate) mod reader;
pub(crate) mod sequence;
pub(crate) mod system;
