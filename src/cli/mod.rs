//! CLI module for the bgremove-batch tool
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;
pub mod menu;

pub use main_impl::{main, Cli, CliModel};
