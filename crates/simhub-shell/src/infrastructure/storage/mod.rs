//! On-disk persistence for the shell.

pub mod config;
