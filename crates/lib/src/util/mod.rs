//! Shared utilities.
//!
//! Atomic file writes used by every module that produces output files, plus test helpers.

pub mod fs;

#[cfg(test)]
pub mod testutil;
