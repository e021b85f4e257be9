//! TUI module for harmonium
//!
//! Reads the keyboard, forwards note events to the engine and shows what the
//! audio thread reports back.

mod keyboard;
pub mod state;
mod status;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::time::Duration;

use harmonium_dsp::{io::KeyMap, EngineHandle, EngineReport, Error, NoteEvent};

pub use state::{UiStateInit, UiStateUpdate};

use keyboard::render_keyboard;
use status::render_status;
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;
/// Pump rate change per key press
const PUMP_STEP: f64 = 0.005;

pub struct UiApp {
    handle: EngineHandle,
    keymap: KeyMap,
    audio_rx: Consumer<f32>,
    state_rx: Consumer<UiStateUpdate>,
    init: UiStateInit,
    current_state: UiStateUpdate,
    audio_buffer: Vec<f32>,
    pump_rate: f64,
    drone: bool,
    /// Latest message from the engine or the event queue
    message: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        handle: EngineHandle,
        audio_rx: Consumer<f32>,
        state_rx: Consumer<UiStateUpdate>,
        init: UiStateInit,
    ) -> Self {
        Self {
            handle,
            keymap: KeyMap::new(),
            audio_rx,
            state_rx,
            init,
            current_state: UiStateUpdate::default(),
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            pump_rate: init.pump_rate,
            drone: false,
            message: String::new(),
            should_quit: false,
        }
    }

    pub fn into_handle(self) -> EngineHandle {
        self.handle
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_state();
            self.poll_reports();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.send(NoteEvent::AllNotesOff);
        self.send(NoteEvent::Drone { on: false });
        Ok(())
    }

    fn poll_audio(&mut self) {
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    fn poll_state(&mut self) {
        while let Ok(state) = self.state_rx.pop() {
            self.current_state = state;
        }
    }

    fn poll_reports(&mut self) {
        while let Some(report) = self.handle.next_report() {
            self.message = match report {
                EngineReport::VoiceRetired { id } => format!("voice {} diverged, retired", id.0),
                EngineReport::NoteRejected { id, frequency } => {
                    format!("note {} rejected at {frequency:.1} Hz", id.0)
                }
                EngineReport::VoiceStolen { evicted, by } => {
                    format!("voice {} stolen for {}", evicted.0, by.0)
                }
                EngineReport::Underrun {
                    elapsed_us,
                    budget_us,
                } => format!("underrun: {elapsed_us}us of {budget_us}us"),
            };
        }
    }

    fn send(&mut self, event: NoteEvent) {
        match self.handle.send(event) {
            Ok(()) => {}
            Err(Error::QueueFull(_)) => self.message = "event queue full, key dropped".into(),
            Err(err) => self.message = err.to_string(),
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => {
                self.keymap.release_all();
                self.send(NoteEvent::AllNotesOff);
            }
            KeyCode::Char('q') => {
                self.pump_rate += PUMP_STEP;
                self.send(NoteEvent::PumpRate {
                    rate: self.pump_rate,
                });
            }
            KeyCode::Char('a') => {
                self.pump_rate = (self.pump_rate - PUMP_STEP).max(0.0);
                self.send(NoteEvent::PumpRate {
                    rate: self.pump_rate,
                });
            }
            KeyCode::Char('d') => {
                self.drone = !self.drone;
                self.send(NoteEvent::Drone { on: self.drone });
            }
            KeyCode::Char(c) => {
                if let Some(event) = self.keymap.toggle(c) {
                    self.send(event);
                }
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status
                Constraint::Length(3), // Keys
                Constraint::Min(8),    // Waveform
                Constraint::Length(3), // Messages
                Constraint::Length(1), // Help
            ])
            .split(frame.area());

        render_status(frame, chunks[0], &self.init, &self.current_state);
        render_keyboard(frame, chunks[1], &self.keymap);
        render_waveform(frame, chunks[2], &self.audio_buffer);

        let messages = Paragraph::new(self.message.as_str())
            .block(Block::default().title(" Engine ").borders(Borders::ALL));
        frame.render_widget(messages, chunks[3]);

        let help = Paragraph::new(" [z..,] Toggle note  [D] Drone  [Space] All off  [Q/A] Pump +/-  [Esc] Quit")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
