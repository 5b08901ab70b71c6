pub mod cloud;
pub mod controller;
pub mod display_power;
pub mod error;
pub mod hardware;
pub mod scales;
pub mod server;
pub mod state;
pub mod storage;
pub mod system;
pub mod types;
pub mod wifi;

pub use controller::*;
pub use types::*;
