pub(crate) mod context;
pub(crate) mod facade;
pub(crate) mod frame;
pub(crate) mod options;
pub(crate) mod scheduler;
