//! Pitch naming
//!
//! Playback pitches are scientific pitch names spelled with sharps
//! ("C4", "C#4", "A#3"), with C4 = MIDI 60. Flats coming from MusicXML are
//! respelled as their sharp enharmonic so every pitch maps onto one sample.

/// Pitch class names, sharps only
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Lowest pitch in the piano sample set (A3)
pub const SAMPLE_LOWEST_MIDI: i32 = 57;

/// Highest pitch in the piano sample set (E6)
pub const SAMPLE_HIGHEST_MIDI: i32 = 88;

/// Semitone of a note letter above C
pub fn step_to_semitone(step: &str) -> Option<i32> {
    match step.to_ascii_uppercase().as_str() {
        "C" => Some(0),
        "D" => Some(2),
        "E" => Some(4),
        "F" => Some(5),
        "G" => Some(7),
        "A" => Some(9),
        "B" => Some(11),
        _ => None,
    }
}

/// Convert a MIDI note number to a pitch name
///
/// ```
/// use score_playback::models::pitch::midi_to_pitch_name;
/// assert_eq!(midi_to_pitch_name(60), "C4");
/// assert_eq!(midi_to_pitch_name(70), "A#4");
/// ```
pub fn midi_to_pitch_name(midi: i32) -> String {
    let class = PITCH_CLASS_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", class, octave)
}

/// Convert MusicXML `<step>`, `<alter>` and `<octave>` to a MIDI note number
///
/// `None` for an unknown step or values too large to name a pitch.
pub fn musicxml_pitch_to_midi(step: &str, alter: i32, octave: i32) -> Option<i32> {
    let base = step_to_semitone(step)?;
    octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(base)?
        .checked_add(alter)
}

/// Parse a pitch name ("C4", "Db4", "F#-1") into a MIDI note number
pub fn pitch_name_to_midi(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let step = chars.next()?;
    let rest = chars.as_str();

    let (alter, octave_str) = match rest.chars().next() {
        Some('#') | Some('s') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str.parse().ok()?;
    musicxml_pitch_to_midi(&step.to_string(), alter, octave)
}

/// Canonical (sharp-spelled) form of a pitch name
pub fn normalize_pitch_name(name: &str) -> Option<String> {
    pitch_name_to_midi(name).map(midi_to_pitch_name)
}

/// Sample file for a pitch in the piano sample set
///
/// Sample files drop the `#` (not URL-safe) in favour of `s`: "A#3" lives in
/// "As3.mp3". Returns `None` outside A3..=E6.
pub fn sample_file_for(pitch: &str) -> Option<String> {
    let midi = pitch_name_to_midi(pitch)?;
    if !(SAMPLE_LOWEST_MIDI..=SAMPLE_HIGHEST_MIDI).contains(&midi) {
        return None;
    }
    Some(format!("{}.mp3", midi_to_pitch_name(midi).replace('#', "s")))
}
