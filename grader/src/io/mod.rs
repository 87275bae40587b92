//! I/O helpers for grader commands.

pub mod archive;
pub mod conda;
pub mod config;
pub mod editor;
pub mod init;
pub mod manifest;
pub mod process;
pub mod roster;
