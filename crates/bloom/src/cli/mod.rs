//! Command-line front end: command handlers and terminal rendering

pub mod commands;
pub mod display;
