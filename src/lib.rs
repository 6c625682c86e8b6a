mod config;
mod constants;
mod coordination;
mod errors;
mod observable;

pub mod metrics;
pub mod utils;

pub use config::*;
pub use coordination::*;
pub use errors::*;
pub use observable::*;
