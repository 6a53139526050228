//! Address relevance filtering for Dropzone.
//!
//! A [`RelevanceTracker`] remembers the addresses a client cares about. It
//! keeps an exact set for local decisions and a [`BloomFilter`] that can be
//! handed to a remote peer so it only forwards transactions that might
//! concern those addresses.

pub mod bloom;
pub mod config;
pub mod tracker;

pub use bloom::BloomFilter;
pub use config::FilterConfig;
pub use tracker::RelevanceTracker;
