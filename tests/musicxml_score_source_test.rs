// MusicXML as the score source for playback
//
// Parse a partwise score, play it at the tempo it declares, and check the
// synthesizer sees the file's own durations.

mod common;

use common::{assert_calls, trigger, Call, Rig};
use score_playback::converters::musicxml::{ensure_safe_xml, parse_score};
use score_playback::playback::SessionState;
use score_playback::{ScoreError, Tempo};

const SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>2</divisions></attributes>
      <direction><sound tempo="60"/></direction>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration></note>
      <note><rest/><duration>1</duration></note>
      <note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn test_parsed_score_plays_at_declared_tempo() {
    let score = parse_score(SCORE).unwrap();
    assert_eq!(score.tempo, Some(60.0));
    assert_eq!(score.notes.len(), 2);

    let mut rig = Rig::new();
    let tempo = Tempo::new(score.tempo.unwrap_or(120.0));
    let session = rig.sync.play(&score.notes, tempo).unwrap();
    rig.clear_log();
    rig.clock.run_until_idle();

    // 60 BPM: one beat per second, plus the 0.2s lead-in
    assert_calls(
        &rig.calls(),
        &[
            (0.2, trigger("C5", 1.0, 0.2)),
            (0.2, Call::Show),
            (1.7, trigger("F#4", 0.5, 1.7)),
            (1.7, Call::Advance),
            (2.7, Call::Reset),
            (2.7, Call::Hide),
        ],
    );
    assert_eq!(session.state(), SessionState::Terminal);
}

#[test]
fn test_entity_declarations_rejected() {
    let hostile = r#"<?xml version="1.0"?>
<!DOCTYPE score-partwise [
  <!ENTITY a "aaaaaaaaaa">
  <!ENTITY b "&a;&a;&a;&a;&a;&a;&a;&a;&a;&a;">
]>
<score-partwise version="3.1"><part-list/></score-partwise>"#;

    assert_eq!(ensure_safe_xml(hostile), Err(ScoreError::UnsafeXml));
    assert_eq!(parse_score(hostile), Err(ScoreError::UnsafeXml));
    assert!(ensure_safe_xml(SCORE).is_ok());
}

#[test]
fn test_malformed_score_is_a_parse_error() {
    let err = parse_score("<score-partwise><part id=\"P1\"><measure>").unwrap_err();
    assert!(matches!(err, ScoreError::ParseError(_)));
}
