//! A user-scoped filesystem service.
//!
//! Every user gets a private directory under the configured root. Mutations on
//! that tree are mirrored into a metadata index (`entries` table) keyed by the
//! forward-slash path relative to the user's root, so the index can be queried
//! without touching the disk.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;
