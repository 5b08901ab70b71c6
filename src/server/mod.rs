pub mod http;
pub mod listener;
pub mod page;
pub mod router;

pub use listener::*;
pub use router::*;
