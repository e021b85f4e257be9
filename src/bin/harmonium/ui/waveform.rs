//! Oscilloscope over the most recent output samples

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Start at the first rising zero crossing in the older half so a held
/// chord draws a steady trace instead of scrolling.
fn trigger(samples: &[f32]) -> usize {
    samples[..samples.len() / 2]
        .windows(2)
        .position(|w| w[0] <= 0.0 && w[1] > 0.0)
        .unwrap_or(0)
}

pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32]) {
    let start = trigger(audio_buffer);
    let view = &audio_buffer[start..];
    let span = view.len().max(1) as f64;

    let rms = if view.is_empty() {
        0.0
    } else {
        (view.iter().map(|s| s * s).sum::<f32>() / view.len() as f32).sqrt()
    };
    let title = if rms > 0.0 {
        format!(" Output  rms {rms:.2} ")
    } else {
        " Output  silent ".to_string()
    };

    let points: Vec<(f64, f64)> = view
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / span, s as f64))
        .collect();

    let trace = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(&points);

    let axis = || Axis::default().style(Style::default().fg(Color::DarkGray));
    let chart = Chart::new(vec![trace])
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(axis().bounds([0.0, 1.0]))
        .y_axis(axis().bounds([-1.0, 1.0]));

    frame.render_widget(chart, area);
}
