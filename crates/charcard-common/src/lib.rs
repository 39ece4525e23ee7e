//! Common utilities for charcard.
//!
//! This crate provides foundational types used across all charcard crates:
//!
//! - [`BinaryReader`] - Zero-copy big-endian reading from byte slices
//! - [`crc`] - The CRC32 checksum PNG uses for every chunk

mod error;
mod reader;

pub mod crc;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

