//! harmonium - play the reed organ from the computer keyboard
//!
//! Run with: cargo run --release

mod app;
mod ui;

use app::Harmonium;
use harmonium_dsp::synth::integrator::Integrator;
use tracing_subscriber::EnvFilter;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("harmonium_dsp=info")),
        )
        .init();

    Harmonium::new()
        .polyphony(8)
        .block_size(256)
        .integrator(Integrator::Midpoint)
        .run()
}
