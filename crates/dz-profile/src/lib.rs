//! Profile reconstruction for Dropzone.
//!
//! A profile is never stored. [`ProfileEngine`] computes it on demand by
//! replaying the verified messages concerning an address, following
//! ownership transfers back through the addresses that issued them:
//!
//! - An address is established once, by its own genesis message or by the
//!   earliest transfer-in that its source was still entitled to issue
//! - The owner's messages merge field by field, oldest first, until its
//!   first transfer-out or cancellation
//! - Anything the owner signs after that is inert

pub mod config;
pub mod engine;
pub mod error;
pub mod profile;

pub use config::EngineConfig;
pub use engine::ProfileEngine;
pub use error::{ProfileError, ProfileResult};
pub use profile::{Profile, ProfileViolation};
