//! Harmonium - audio device setup and the realtime callback

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use rtrb::{Producer, RingBuffer};

use harmonium_dsp::{synth::integrator::Integrator, Engine, EngineBuilder};

use super::ui::{UiApp, UiStateInit, UiStateUpdate};

/// Samples kept for the oscilloscope
const VIS_QUEUE_SIZE: usize = 8192;
const STATE_QUEUE_SIZE: usize = 64;

pub struct Harmonium {
    builder: EngineBuilder,
}

impl Harmonium {
    pub fn new() -> Self {
        Self {
            builder: EngineBuilder::new(),
        }
    }

    pub fn polyphony(mut self, voices: usize) -> Self {
        self.builder = self.builder.max_polyphony(voices);
        self
    }

    pub fn block_size(mut self, frames: usize) -> Self {
        self.builder = self.builder.block_size(frames);
        self
    }

    pub fn integrator(mut self, integrator: Integrator) -> Self {
        self.builder = self.builder.integrator(integrator);
        self
    }

    /// Open the default output device, start the stream and hand the terminal
    /// to the UI until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f64;
        let channels = config.channels() as usize;

        let (engine, handle) = self
            .builder
            .sample_rate(sample_rate)
            .build()
            .wrap_err("failed to build engine")?;

        tracing::info!(sample_rate, channels, "audio device opened");

        let init = UiStateInit {
            sample_rate,
            block_size: engine.block_size(),
            polyphony: engine.voices().capacity(),
            pump_rate: engine.pump_rate(),
        };

        let (vis_tx, vis_rx) = RingBuffer::<f32>::new(VIS_QUEUE_SIZE);
        let (state_tx, state_rx) = RingBuffer::<UiStateUpdate>::new(STATE_QUEUE_SIZE);

        let mut callback = AudioCallback::new(engine, vis_tx, state_tx);
        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| callback.fill(data, channels),
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;

        let mut app = UiApp::new(handle, vis_rx, state_rx, init);
        let mut terminal = ratatui::init();
        let result = app.run(&mut terminal);
        ratatui::restore();
        drop(stream);
        result?;

        // Anything the UI did not get to
        app.into_handle().log_reports();
        Ok(())
    }
}

impl Default for Harmonium {
    fn default() -> Self {
        Self::new()
    }
}

/// State owned by the audio thread. cpal asks for arbitrary frame counts, so
/// whole engine blocks are rendered and handed out piecewise.
struct AudioCallback {
    engine: Engine,
    block: Vec<f32>,
    pos: usize,
    vis_tx: Producer<f32>,
    state_tx: Producer<UiStateUpdate>,
}

impl AudioCallback {
    fn new(engine: Engine, vis_tx: Producer<f32>, state_tx: Producer<UiStateUpdate>) -> Self {
        let block_size = engine.block_size();
        Self {
            engine,
            block: vec![0.0; block_size],
            pos: block_size,
            vis_tx,
            state_tx,
        }
    }

    fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_exact_mut(channels) {
            if self.pos == self.block.len() {
                let status = self.engine.generate_block(&mut self.block);
                self.pos = 0;

                let _ = self.state_tx.push(UiStateUpdate {
                    active_voices: self.engine.active_voices(),
                    drone: self.engine.drone_active(),
                    pressure: self.engine.pressure() as f32,
                    pump_rate: self.engine.pump_rate() as f32,
                    load: status.load() as f32,
                    underruns: self.engine.underruns(),
                    faults: self.engine.faults(),
                });
            }

            let sample = self.block[self.pos];
            self.pos += 1;
            frame.fill(sample);
            let _ = self.vis_tx.push(sample);
        }
    }
}
