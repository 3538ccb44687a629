//! trustgate: a trust boundary for embedded build-descriptor loading.
//!
//! Loading a project descriptor can pull executable extensions from whatever
//! repositories the descriptor names. This crate puts three gates in front of
//! that: descriptor repositories are filtered before ordinary resolution,
//! extension sources must be allow-listed before anything is fetched, and
//! extension code must be allow-listed before it is wired in. Every decision
//! is recorded.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod types;

pub mod engine;
pub mod policy;

pub mod loader;
