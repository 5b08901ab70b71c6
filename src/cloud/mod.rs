pub mod client;
pub mod nutrition;

pub use client::*;
pub use nutrition::*;
