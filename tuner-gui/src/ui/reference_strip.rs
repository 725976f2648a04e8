//! # Reference Strip
//!
//! Target pitches of the open strings of a guitar in standard tuning,
//! computed from the configured reference pitch.

use iced::widget::{column, container, row, text};
use iced::{Element, Length};
use tuner_core::{Note, ScopeConfig};

/// Open strings from low to high.
const STANDARD_TUNING: [&str; 6] = ["E2", "A2", "D3", "G3", "B3", "E4"];

/// The open-string notes against the configured reference.
pub fn reference_notes(config: &ScopeConfig) -> Vec<Note> {
    STANDARD_TUNING
        .iter()
        .filter_map(|name| Note::from_name(name))
        .map(|note| Note::with_reference(note.position(), config.reference_hz, config.reference_index))
        .collect()
}

/// Creates the reference panel.
pub fn create_reference_panel(config: &ScopeConfig) -> Element<'static, crate::Message> {
    let strings = reference_notes(config)
        .into_iter()
        .fold(row![].spacing(24), |strip, note| {
            strip.push(column![
                text(note.to_string()).size(20),
                text(format!("{:.2} Hz", note.to_hertz())).size(14),
            ])
        });

    container(
        column![
            text(format!("Reference A = {:.1} Hz", config.reference_hz)).size(14),
            strings,
        ]
        .spacing(8),
    )
    .width(Length::Fill)
    .into()
}
