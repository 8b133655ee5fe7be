//! CLI command implementations

pub mod list;
pub mod pack;
pub mod unpack;
pub mod verify;
