//! Conditioning tag string.
//!
//! The model is conditioned on a comma-separated list of style fragments.
//! The Generator node assembles it from three preset selectors (style, vocal,
//! instrument) and a free-text field:
//!
//! ```text
//! style fragments, vocal fragment, instrument fragments, free text
//! ```
//!
//! Preset selectors are comma-joined lists where `"None"` and empty entries
//! mean "nothing selected".

use crate::{Error, Result};

/// Placeholder the host uses for an empty preset selection.
pub const NONE: &str = "None";

/// Fragment used for unrecognized vocal labels.
pub const DEFAULT_VOCAL: &str = "female vocal";

/// Vocal selector labels offered by the host UI.
pub const VOCAL_PRESETS: &[&str] = &["Female", "Male", "Chorus"];

pub const STYLE_PRESETS: &[&str] = &[
    "pop", "rock", "R&B", "jazz", "electronic", "classical", "hip hop", "folk", "metal",
    "country", "blues", "reggae", "punk", "disco", "house", "techno", "trance", "dubstep",
    "ambient", "indie", "soul", "funk", "latin", "k-pop", "j-pop", "opera", "gospel",
];

pub const INSTRUMENT_PRESETS: &[&str] = &[
    "piano", "violin", "ukulele", "djembe", "guitar", "drums", "bass", "synthesizer", "flute",
    "cello", "trumpet", "saxophone", "harp", "accordion", "banjo", "harmonica", "clarinet",
    "trombone", "organ", "bongo", "sitar",
];

/// Map a vocal selector label to its tag fragment.
///
/// English and Chinese labels are accepted; anything else falls back to
/// [`DEFAULT_VOCAL`].
pub fn vocal_fragment(label: &str) -> &'static str {
    match label {
        "Male" | "男" => "male vocal",
        "Female" | "女" => "female vocal",
        "Chorus" | "合唱" => "chorus",
        _ => DEFAULT_VOCAL,
    }
}

/// Split a preset selection into its trimmed, non-empty, non-`None` entries.
pub fn preset_fragments(selection: &str) -> impl Iterator<Item = &str> {
    selection
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != NONE)
}

/// Assemble the final tag string.
///
/// The free-text `tags` are appended verbatim (untrimmed) when they contain
/// anything but whitespace.
pub fn build_tags(
    style_preset: &str,
    vocal_gender: &str,
    instrument_preset: &str,
    tags: &str,
) -> String {
    let mut fragments: Vec<&str> = preset_fragments(style_preset).collect();
    fragments.push(vocal_fragment(vocal_gender));
    fragments.extend(preset_fragments(instrument_preset));
    if !tags.trim().is_empty() {
        fragments.push(tags);
    }
    fragments.join(", ")
}

/// Toggle `item` in a multi-select preset selection.
///
/// Selected items are removed, others appended. An empty result is
/// reported as [`NONE`].
pub fn toggle_preset(selection: &str, item: &str) -> String {
    let items: Vec<&str> = if is_selected(selection, item) {
        preset_fragments(selection).filter(|s| *s != item).collect()
    } else {
        preset_fragments(selection).chain([item]).collect()
    };
    if items.is_empty() {
        NONE.to_string()
    } else {
        items.join(",")
    }
}

/// Whether `item` is part of a preset selection.
pub fn is_selected(selection: &str, item: &str) -> bool {
    preset_fragments(selection).any(|s| s == item)
}

/// Reject selection entries missing from `catalog`.
///
/// `field` names the selector in the error message.
pub fn check_presets(field: &str, selection: &str, catalog: &[&str]) -> Result<()> {
    let unknown: Vec<&str> = preset_fragments(selection)
        .filter(|s| !catalog.contains(s))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(Error::InvalidInput(format!(
        "{field}: unknown preset {}; expected any of {}",
        unknown.join(", "),
        catalog.join(", ")
    )))
}
