//! Keyboard row - which keys are sounding

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use harmonium_dsp::io::KeyMap;

const SWARAS: [&str; 8] = ["Sa", "Re", "Ga", "Ma", "Pa", "Dha", "Ni", "Sa'"];

pub fn render_keyboard(frame: &mut Frame, area: Rect, keymap: &KeyMap) {
    let block = Block::default().title(" Keys ").borders(Borders::ALL);

    let spans: Vec<Span> = keymap
        .keys()
        .zip(SWARAS)
        .map(|(key, swara)| {
            let style = if keymap.is_held(key) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Span::styled(format!(" [{key}] {swara:<3} "), style)
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
