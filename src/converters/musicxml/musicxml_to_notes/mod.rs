//! MusicXML → playback notes
//!
//! The score source for playback: reads a `score-partwise` document into
//! time-ordered [`NoteEvent`]s with the durations the file states, plus the
//! tempo the score declares (if any).

mod parse;

pub use parse::parse_musicxml_notes;

use serde::Serialize;

use crate::error::ScoreError;
use crate::models::NoteEvent;

/// Notes and tempo read from a score
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScore {
    pub notes: Vec<NoteEvent>,
    /// Tempo from `<sound tempo>` or `<metronome>`; `None` if the score has neither
    pub tempo: Option<f64>,
}

/// Reject documents that declare entities
///
/// Entity declarations enable expansion attacks ("billion laughs") and
/// external entity reads; no score we play needs them.
pub fn ensure_safe_xml(xml: &str) -> Result<(), ScoreError> {
    if xml.contains("<!ENTITY") {
        log::warn!("Rejected score containing an entity declaration");
        return Err(ScoreError::UnsafeXml);
    }
    Ok(())
}

/// Safety check plus parse; the entry point for untrusted score text
pub fn parse_score(xml: &str) -> Result<ParsedScore, ScoreError> {
    ensure_safe_xml(xml)?;
    let score = parse_musicxml_notes(xml)?;
    log::debug!(
        "Parsed score: {} notes, tempo {:?}",
        score.notes.len(),
        score.tempo
    );
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_declaration_rejected_before_parsing() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE lolz [<!ENTITY lol "lol">]>
<score-partwise><part-list/></score-partwise>"#;
        assert_eq!(parse_score(xml), Err(ScoreError::UnsafeXml));
    }

    #[test]
    fn test_plain_doctype_allowed() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1"><part-list/></score-partwise>"#;
        let score = parse_score(xml).unwrap();
        assert!(score.notes.is_empty());
    }
}
