pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod paths;
pub mod restore;
pub mod snapshot;
pub mod verify;

pub use error::{Result, VaultError};
