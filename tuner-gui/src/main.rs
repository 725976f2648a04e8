//! # Tuner - Live Waveform and Spectrum Scope
//!
//! This module contains the main GUI application. It requests the
//! microphone once, and when access is granted redraws the waveform and the
//! spectrum on every display frame.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application, runs the visualization loop
//! - **Audio Thread**: CPAL input stream, owned by `tuner-core`
//! - **Communication**: Crossbeam channels for the grant and the audio frames
//! - **Updates**: `window::frames()` drives one loop iteration per refresh

mod ui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use iced::time::Instant;
use iced::{Element, Subscription, Task, Theme};
use tuner_core::{
    Analyser, CaptureProvider, CpalProvider, DisplayList, ProvisionStatus, Provisioning,
    ScopeConfig, Simulated, StopToken, SurfaceSet, Visualizer,
};
use ui::main_display::create_main_view;

/// How often an outstanding capture request is polled.
const GRANT_POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "tuner", about = "Live waveform and spectrum scope for instrument tuning")]
struct Args {
    /// Feed a sine tone of this frequency (Hz) instead of the microphone
    #[arg(long, value_name = "HZ")]
    simulate: Option<f32>,

    /// Pretend the microphone permission was refused
    #[arg(long, conflicts_with = "simulate")]
    deny: bool,

    /// JSON file overriding the scope configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Main entry point for the tuner application.
pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ScopeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ScopeConfig::default(),
    };

    log::info!("[MAIN] Starting tuner...");
    iced::application("Tuner", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run_with(move || (TunerApp::new(&args, config), Task::none()))?;
    log::info!("[MAIN] Application finished");
    Ok(())
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    /// Poll the outstanding capture request
    Tick,
    /// The display is ready for a new frame
    Frame(Instant),
    /// Stop the visualization loop
    Stop,
}

/// Where the audio graph is in its lifecycle.
pub enum ScopeState {
    /// Waiting for the capture grant
    Provisioning(Provisioning<Analyser, DisplayList>),
    /// The loop is bound to the live analyser
    Running(Visualizer<Analyser, DisplayList>),
    /// Capture was refused; the plots stay blank
    Failed(String),
}

struct TunerApp {
    state: ScopeState,
    stop: StopToken,
    config: ScopeConfig,
}

impl TunerApp {
    /// Creates the application and issues the one capture request.
    ///
    /// The plot dimensions are copied from the config here and never re-read.
    fn new(args: &Args, config: ScopeConfig) -> Self {
        let provider: Box<dyn CaptureProvider> = if args.deny {
            Box::new(Simulated::Deny("permission denied (simulated)".into()))
        } else if let Some(frequency) = args.simulate {
            Box::new(Simulated::Tone {
                frequency,
                amplitude: 0.8,
                sample_rate: config.target_sample_rate,
            })
        } else {
            Box::new(CpalProvider {
                target_sample_rate: config.target_sample_rate,
            })
        };

        let surfaces = SurfaceSet::new(
            DisplayList::new(config.surface_width, config.surface_height),
            DisplayList::new(config.surface_width, config.surface_height),
        );
        let provisioning = Provisioning::request(provider.as_ref(), &config, surfaces);

        Self {
            state: ScopeState::Provisioning(provisioning),
            stop: StopToken::new(),
            config,
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::Tick => {
                if let ScopeState::Provisioning(provisioning) = &mut self.state {
                    match provisioning.poll() {
                        ProvisionStatus::Pending | ProvisionStatus::Resolved => {}
                        ProvisionStatus::Started(visualizer) => {
                            log::info!("[MAIN] Microphone granted, visualization running");
                            self.state = ScopeState::Running(visualizer);
                        }
                        ProvisionStatus::Failed(e) => {
                            self.state = ScopeState::Failed(e.to_string());
                        }
                    }
                }
            }
            Message::Frame(_) => {
                if let ScopeState::Running(visualizer) = &mut self.state {
                    if !self.stop.is_stopped() {
                        visualizer.step();
                    }
                }
            }
            Message::Stop => {
                log::info!("[MAIN] Stop requested");
                self.stop.stop();
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.state, &self.config, self.stop.is_stopped())
    }

    /// Polls the grant while provisioning, then follows the display refresh
    /// until stopped.
    fn subscription(&self) -> Subscription<Message> {
        match &self.state {
            ScopeState::Provisioning(_) => {
                iced::time::every(GRANT_POLL_INTERVAL).map(|_| Message::Tick)
            }
            ScopeState::Running(_) if !self.stop.is_stopped() => {
                iced::window::frames().map(Message::Frame)
            }
            _ => Subscription::none(),
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
