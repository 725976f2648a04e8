//! # Main Display Module
//!
//! This module contains the layout of the tuner window: a status line, the
//! waveform and spectrum plots, and the reference strip.

use iced::widget::{Space, button, column, container, row, text};
use iced::{Alignment, Element, Length};
use tuner_core::{ScopeConfig, SurfaceId};

use super::reference_strip;
use crate::ScopeState;
use crate::widgets::plot::Plot;

/// Creates the complete main application view
pub fn create_main_view<'a>(
    state: &'a ScopeState,
    config: &ScopeConfig,
    stopped: bool,
) -> Element<'a, crate::Message> {
    let title = text("Tuner").size(28);

    let status = match state {
        ScopeState::Provisioning(_) => "Waiting for microphone access...".to_string(),
        ScopeState::Running(vis) if stopped => {
            format!("Stopped after {} frames", vis.frames_drawn())
        }
        ScopeState::Running(vis) => format!("Live, {} frames drawn", vis.frames_drawn()),
        ScopeState::Failed(reason) => format!("Microphone unavailable: {reason}"),
    };

    let stop_button = button(text("Stop"))
        .on_press_maybe((matches!(state, ScopeState::Running(_)) && !stopped).then_some(crate::Message::Stop));

    let (time_plot, freq_plot) = match state {
        ScopeState::Running(vis) => (
            Plot::new(vis.surfaces().get(SurfaceId::Time)).view(),
            Plot::new(vis.surfaces().get(SurfaceId::Freq)).view(),
        ),
        // Until the graph is up the plots stay blank.
        _ => (blank_plot(config), blank_plot(config)),
    };

    let main_content = column![
        row![title, Space::with_width(Length::Fill), stop_button].align_y(Alignment::Center),
        text(status).size(14),
        create_plot_panel("Waveform", time_plot),
        create_plot_panel("Spectrum", freq_plot),
        reference_strip::create_reference_panel(config),
    ]
    .spacing(10)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn create_plot_panel<'a>(
    label: &'static str,
    plot: Element<'a, crate::Message>,
) -> Element<'a, crate::Message> {
    container(column![text(label).size(18), plot].spacing(5))
        .width(Length::Fill)
        .into()
}

fn blank_plot(config: &ScopeConfig) -> Element<'static, crate::Message> {
    Space::new(
        Length::Fixed(config.surface_width),
        Length::Fixed(config.surface_height),
    )
    .into()
}
