pub mod display;
pub mod hx711;

pub use display::*;
pub use hx711::*;
