pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod constant;
pub mod core;
pub mod error;
pub mod flow;
pub mod format;
pub mod packet;
pub mod pairing;
pub mod sink;
pub mod source;
pub mod token;
pub mod wire;

pub use config::{CliArgs, Config};
pub use error::{Error, Result};
