pub mod file_store;
pub mod log_sink;

pub use file_store::*;
pub use log_sink::*;
