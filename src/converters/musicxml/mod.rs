//! MusicXML format converters

pub mod musicxml_to_notes;

// Re-export for convenience
pub use musicxml_to_notes::{ensure_safe_xml, parse_musicxml_notes, parse_score, ParsedScore};
