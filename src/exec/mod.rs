// src/exec/mod.rs

//! Process-backed reactions for tasks loaded from a config file.

pub mod command;

pub use command::ShellReaction;
