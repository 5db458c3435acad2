//! Cinefilm - FILM movie inspection and interleave repair tool
//!
//! This library crate exposes the CLI-facing pieces for integration testing.

pub mod config;
pub mod summary;
