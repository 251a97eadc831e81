//! rpack distributes versioned bundles of files plus a scripted
//! transformation that deterministically materializes output files into a
//! target directory.
//!
//! The core is a mediated virtual filesystem: every script-initiated file
//! operation goes through named resolvers, access-control and purity hooks,
//! and an append-only recorder, feeding a transactional commit that tracks
//! checksums through a lockfile.

pub mod cancel;
pub mod checker;
pub mod cli;
pub mod config;
pub mod definition;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod inputs;
pub mod lockfile;
pub mod logging;
pub mod paths;
pub mod sandbox;
pub mod script;
pub mod util;

pub use error::{Error, Result};
