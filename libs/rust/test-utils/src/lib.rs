//! Shared test utilities for Quill.
//!
//! This crate provides:
//! - Proptest generators for emails, secrets, post bodies and lifetimes
//! - Fixtures with sample accounts and a hand-written snapshot document

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
