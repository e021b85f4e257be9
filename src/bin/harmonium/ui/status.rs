//! Status bar - bellows, voices and audio thread load

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{UiStateInit, UiStateUpdate};

pub fn render_status(frame: &mut Frame, area: Rect, init: &UiStateInit, state: &UiStateUpdate) {
    let block = Block::default().title(" harmonium ").borders(Borders::ALL);

    let load_color = if state.load > 0.8 {
        Color::Red
    } else if state.load > 0.5 {
        Color::Yellow
    } else {
        Color::Green
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" Voices: {}/{}  ", state.active_voices, init.polyphony),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            if state.drone { "Drone  " } else { "" },
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("Pressure: {:>7.1} Pa  ", state.pressure),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Pump: {:.3}  ", state.pump_rate),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Load: {:>3.0}%  ", state.load * 100.0),
            Style::default().fg(load_color),
        ),
        Span::styled(
            format!("Underruns: {}  Faults: {}  ", state.underruns, state.faults),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!(
                "{:.1}kHz / {} frames",
                init.sample_rate / 1000.0,
                init.block_size
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
