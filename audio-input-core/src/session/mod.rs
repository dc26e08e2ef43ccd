pub mod context;
pub mod handle;
pub mod lifecycle;
pub(crate) mod monitor;
