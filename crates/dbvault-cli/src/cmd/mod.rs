pub mod backup;
pub mod config;
pub mod list;
pub mod restore;
pub mod verify;
