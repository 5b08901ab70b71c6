pub mod manager;
pub mod time_sync;

pub use manager::*;
pub use time_sync::*;
