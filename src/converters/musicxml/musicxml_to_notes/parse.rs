use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ParsedScore;
use crate::error::ScoreError;
use crate::models::pitch::{midi_to_pitch_name, musicxml_pitch_to_midi, step_to_semitone};
use crate::models::NoteEvent;

type Result<T> = std::result::Result<T, ScoreError>;

/// A note while its part is still being read (ties may still lengthen it)
#[derive(Debug, Clone)]
struct PendingNote {
    midi: i32,
    start_beat: f64,
    duration_beats: f64,
}

/// Everything read from one `<note>` element
#[derive(Debug, Default)]
struct NoteData {
    is_rest: bool,
    is_chord: bool,
    is_grace: bool,
    step: String,
    alter: i32,
    octave: i32,
    duration_divs: u64,
    voice: u8,
    tie_start: bool,
    tie_stop: bool,
}

/// Per-part reading position
struct PartCursor {
    divisions: u64,
    position_beats: f64,
    last_note_start: f64,
    notes: Vec<PendingNote>,
    // (midi, voice) -> index of the note a tie is extending
    open_ties: HashMap<(i32, u8), usize>,
}

impl PartCursor {
    fn new() -> Self {
        Self {
            divisions: 1,
            position_beats: 0.0,
            last_note_start: 0.0,
            notes: Vec::new(),
            open_ties: HashMap::new(),
        }
    }

    fn divs_to_beats(&self, divs: u64) -> f64 {
        divs as f64 / self.divisions as f64
    }

    fn add_note(&mut self, note: NoteData) -> Result<()> {
        let duration_beats = self.divs_to_beats(note.duration_divs);

        // Chord members share the previous note's onset and do not move time
        let start_beat = if note.is_chord {
            self.last_note_start
        } else {
            let start = self.position_beats;
            self.position_beats += duration_beats;
            self.last_note_start = start;
            start
        };

        if note.is_rest || note.is_grace || note.duration_divs == 0 {
            return Ok(());
        }

        // Unpitched (percussion) notes keep their time but make no sound here
        if note.step.is_empty() {
            log::warn!("Skipping note without a pitch at beat {}", start_beat);
            return Ok(());
        }

        if step_to_semitone(&note.step).is_none() {
            return Err(ScoreError::InvalidValue {
                element: "step".to_string(),
                value: note.step,
            });
        }
        let midi = musicxml_pitch_to_midi(&note.step, note.alter, note.octave).ok_or_else(|| {
            ScoreError::InvalidValue {
                element: "pitch".to_string(),
                value: format!("{}{:+} octave {}", note.step, note.alter, note.octave),
            }
        })?;
        let key = (midi, note.voice);

        if note.tie_stop {
            if let Some(&index) = self.open_ties.get(&key) {
                let tied = &mut self.notes[index];
                tied.duration_beats = start_beat + duration_beats - tied.start_beat;
                if !note.tie_start {
                    self.open_ties.remove(&key);
                }
                return Ok(());
            }
        }

        self.notes.push(PendingNote {
            midi,
            start_beat,
            duration_beats,
        });
        if note.tie_start {
            self.open_ties.insert(key, self.notes.len() - 1);
        }
        Ok(())
    }
}

/// Read a MusicXML `score-partwise` document into note events and a tempo
pub fn parse_musicxml_notes(xml: &str) -> Result<ParsedScore> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut saw_root = false;
    let mut root_closed = false;
    let mut sound_tempo: Option<f64> = None;
    let mut metronome_tempo: Option<f64> = None;
    let mut current_part: Option<PartCursor> = None;
    let mut pending: Vec<PendingNote> = Vec::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| {
                ScoreError::ParseError(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?
            .into_owned();

        match event {
            Event::Start(e) => {
                if !saw_root {
                    check_root(&e)?;
                    saw_root = true;
                    continue;
                }
                match e.name().as_ref() {
                    b"part" => current_part = Some(PartCursor::new()),
                    b"divisions" => {
                        let text = parse_text_content(&mut reader, &mut buf)?;
                        let divisions: u64 = text.trim().parse().unwrap_or(0);
                        if divisions == 0 {
                            return Err(ScoreError::InvalidValue {
                                element: "divisions".to_string(),
                                value: text,
                            });
                        }
                        if let Some(part) = current_part.as_mut() {
                            part.divisions = divisions;
                        }
                    }
                    b"sound" => {
                        if sound_tempo.is_none() {
                            sound_tempo = parse_tempo_from_sound(&e);
                        }
                    }
                    b"per-minute" => {
                        let text = parse_text_content(&mut reader, &mut buf)?;
                        if metronome_tempo.is_none() {
                            metronome_tempo = text.trim().parse().ok().filter(|t: &f64| *t > 0.0);
                        }
                    }
                    b"note" => {
                        let note = parse_note(&mut reader, &mut buf)?;
                        if let Some(part) = current_part.as_mut() {
                            part.add_note(note)?;
                        }
                    }
                    b"backup" => {
                        let divs = parse_duration_block(&mut reader, &mut buf, b"backup")?;
                        if let Some(part) = current_part.as_mut() {
                            let beats = part.divs_to_beats(divs);
                            part.position_beats = (part.position_beats - beats).max(0.0);
                        }
                    }
                    b"forward" => {
                        let divs = parse_duration_block(&mut reader, &mut buf, b"forward")?;
                        if let Some(part) = current_part.as_mut() {
                            part.position_beats += part.divs_to_beats(divs);
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    check_root(&e)?;
                    saw_root = true;
                    root_closed = true;
                    continue;
                }
                if e.name().as_ref() == b"sound" && sound_tempo.is_none() {
                    sound_tempo = parse_tempo_from_sound(&e);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"part" => {
                    if let Some(part) = current_part.take() {
                        pending.extend(part.notes);
                    }
                }
                b"score-partwise" => root_closed = true,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ScoreError::ParseError(
            "document has no <score-partwise> root".to_string(),
        ));
    }
    if !root_closed {
        return Err(ScoreError::ParseError(
            "document ended before </score-partwise>".to_string(),
        ));
    }

    // Stable: notes at the same beat keep document order
    pending.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));

    let notes = pending
        .into_iter()
        .map(|note| {
            NoteEvent::new(midi_to_pitch_name(note.midi), note.start_beat, note.duration_beats)
                .map_err(|e| ScoreError::InvalidValue {
                    element: "note".to_string(),
                    value: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedScore {
        notes,
        tempo: sound_tempo.or(metronome_tempo),
    })
}

fn check_root(e: &BytesStart) -> Result<()> {
    match e.name().as_ref() {
        b"score-partwise" => Ok(()),
        b"score-timewise" => Err(ScoreError::ParseError(
            "score-timewise format is not supported (use score-partwise)".to_string(),
        )),
        other => Err(ScoreError::ParseError(format!(
            "expected <score-partwise>, found <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn parse_note(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<NoteData> {
    let mut note = NoteData {
        octave: 4,
        voice: 1,
        ..NoteData::default()
    };

    loop {
        buf.clear();
        let event = reader
            .read_event_into(buf)
            .map_err(|e| ScoreError::ParseError(format!("Error parsing note: {}", e)))?
            .into_owned();

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"step" => note.step = parse_text_content(reader, buf)?.trim().to_string(),
                b"alter" => {
                    // Microtonal alters ("0.5") round to the nearest semitone
                    let text = parse_text_content(reader, buf)?;
                    note.alter = text.trim().parse::<f64>().map(|a| a.round() as i32).unwrap_or(0);
                }
                b"octave" => {
                    let text = parse_text_content(reader, buf)?;
                    note.octave = text.trim().parse().map_err(|_| ScoreError::InvalidValue {
                        element: "octave".to_string(),
                        value: text.clone(),
                    })?;
                }
                b"duration" => {
                    note.duration_divs = parse_text_content(reader, buf)?.trim().parse().unwrap_or(0);
                }
                b"voice" => {
                    note.voice = parse_text_content(reader, buf)?.trim().parse().unwrap_or(1);
                }
                b"rest" => note.is_rest = true,
                b"tie" => apply_tie(&e, &mut note),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"rest" => note.is_rest = true,
                b"chord" => note.is_chord = true,
                b"grace" => note.is_grace = true,
                b"tie" => apply_tie(&e, &mut note),
                _ => {}
            },
            Event::End(e) => {
                if e.name().as_ref() == b"note" {
                    break;
                }
            }
            Event::Eof => {
                return Err(ScoreError::ParseError(
                    "document ended inside <note>".to_string(),
                ))
            }
            _ => {}
        }
    }

    Ok(note)
}

fn apply_tie(e: &BytesStart, note: &mut NoteData) {
    match attribute_value(e, b"type").as_deref() {
        Some("start") => note.tie_start = true,
        Some("stop") => note.tie_stop = true,
        _ => {}
    }
}

/// Read the `<duration>` inside a `<backup>` or `<forward>` element
fn parse_duration_block(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    element: &[u8],
) -> Result<u64> {
    let mut divs = 0u64;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(buf)
            .map_err(|e| ScoreError::ParseError(format!("Error parsing duration: {}", e)))?
            .into_owned();

        match event {
            Event::Start(e) if e.name().as_ref() == b"duration" => {
                divs = parse_text_content(reader, buf)?.trim().parse().unwrap_or(0);
            }
            Event::End(e) if e.name().as_ref() == element => break,
            Event::Eof => {
                return Err(ScoreError::ParseError(format!(
                    "document ended inside <{}>",
                    String::from_utf8_lossy(element)
                )))
            }
            _ => {}
        }
    }

    Ok(divs)
}

fn parse_tempo_from_sound(e: &BytesStart) -> Option<f64> {
    attribute_value(e, b"tempo")
        .and_then(|s| s.trim().parse().ok())
        .filter(|tempo: &f64| *tempo > 0.0)
}

fn attribute_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn parse_text_content(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<String> {
    buf.clear();
    match reader.read_event_into(buf) {
        Ok(Event::Text(e)) => e
            .unescape()
            .map(|text| text.into_owned())
            .map_err(|e| ScoreError::ParseError(format!("Invalid text: {}", e))),
        Ok(_) => Ok(String::new()),
        Err(e) => Err(ScoreError::ParseError(format!("Error reading text: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(measures: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
{}
  </part>
</score-partwise>"#,
            measures
        )
    }

    #[test]
    fn test_parse_simple_note() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>4</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).expect("Failed to parse");
        assert_eq!(score.notes.len(), 1);
        assert_eq!(score.notes[0].pitch(), "C4");
        assert_eq!(score.notes[0].start_beat(), 0.0);
        assert_eq!(score.notes[0].duration_beats(), 1.0);
        assert_eq!(score.tempo, None);
    }

    #[test]
    fn test_rest_advances_time() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>2</divisions></attributes>
      <note><rest/><duration>2</duration></note>
      <note><pitch><step>D</step><alter>-1</alter><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).unwrap();
        assert_eq!(score.notes.len(), 1);
        assert_eq!(score.notes[0].pitch(), "C#4");
        assert_eq!(score.notes[0].start_beat(), 1.0);
        assert_eq!(score.notes[0].duration_beats(), 0.5);
    }

    #[test]
    fn test_chord_shares_onset() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
      <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).unwrap();
        let starts: Vec<(&str, f64)> =
            score.notes.iter().map(|n| (n.pitch(), n.start_beat())).collect();
        assert_eq!(starts, vec![("C4", 0.0), ("E4", 0.0), ("G4", 1.0)]);
    }

    #[test]
    fn test_tie_merges_duration() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>2</duration><tie type="start"/></note>
    </measure>
    <measure number="2">
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>1</duration><tie type="stop"/></note>
      <note><pitch><step>B</step><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).unwrap();
        assert_eq!(score.notes.len(), 2);
        assert_eq!(score.notes[0].pitch(), "A4");
        assert_eq!(score.notes[0].duration_beats(), 3.0);
        assert_eq!(score.notes[1].start_beat(), 3.0);
    }

    #[test]
    fn test_backup_starts_second_voice() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice></note>
      <backup><duration>2</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>2</duration><voice>2</voice></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).unwrap();
        assert_eq!(score.notes.len(), 2);
        assert!(score.notes.iter().all(|n| n.start_beat() == 0.0));
    }

    #[test]
    fn test_tempo_from_sound_and_metronome() {
        let xml = wrap(
            r#"<measure number="1">
      <direction><direction-type><metronome><beat-unit>quarter</beat-unit><per-minute>90</per-minute></metronome></direction-type><sound tempo="96"/></direction>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        assert_eq!(parse_musicxml_notes(&xml).unwrap().tempo, Some(96.0));

        let xml = wrap(
            r#"<measure number="1">
      <direction><direction-type><metronome><beat-unit>quarter</beat-unit><per-minute>90</per-minute></metronome></direction-type></direction>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        assert_eq!(parse_musicxml_notes(&xml).unwrap().tempo, Some(90.0));
    }

    #[test]
    fn test_rejects_timewise_and_truncated() {
        let timewise = r#"<score-timewise version="3.1"></score-timewise>"#;
        assert!(matches!(
            parse_musicxml_notes(timewise),
            Err(ScoreError::ParseError(_))
        ));

        let truncated = r#"<score-partwise><part id="P1"><measure number="1">"#;
        assert!(parse_musicxml_notes(truncated).is_err());

        let mismatched = r#"<score-partwise><part id="P1"></measure></score-partwise>"#;
        assert!(parse_musicxml_notes(mismatched).is_err());

        assert!(parse_musicxml_notes("").is_err());
    }

    #[test]
    fn test_zero_divisions_is_invalid() {
        let xml = wrap(
            r#"<measure number="1"><attributes><divisions>0</divisions></attributes></measure>"#,
        );
        assert!(matches!(
            parse_musicxml_notes(&xml),
            Err(ScoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unpitched_note_skipped_but_keeps_time() {
        let xml = wrap(
            r#"<measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
      <note><unpitched><display-step>E</display-step><display-octave>4</display-octave></unpitched><duration>1</duration></note>
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        let score = parse_musicxml_notes(&xml).unwrap();
        let starts: Vec<(&str, f64)> =
            score.notes.iter().map(|n| (n.pitch(), n.start_beat())).collect();
        assert_eq!(starts, vec![("C4", 0.0), ("G4", 2.0)]);
    }

    #[test]
    fn test_huge_octave_is_invalid_not_a_crash() {
        let xml = wrap(
            r#"<measure number="1">
      <note><pitch><step>C</step><octave>2147483647</octave></pitch><duration>1</duration></note>
    </measure>"#,
        );
        assert!(matches!(
            parse_musicxml_notes(&xml),
            Err(ScoreError::InvalidValue { .. })
        ));
    }
}
