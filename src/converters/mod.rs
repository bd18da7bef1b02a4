//! Format converters
//!
//! This module contains converters from score formats into playback notes.

pub mod musicxml;

pub use musicxml::{parse_score, ParsedScore};
