pub mod calibrated;

pub use calibrated::*;
