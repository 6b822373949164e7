#![forbid(unsafe_code)]
//! pls: a directory lister that classifies each node and applies layered,
//! user-defined presentation rules to it.

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod node;
pub mod options;
pub mod render;
pub mod terminal;
pub mod tree;
