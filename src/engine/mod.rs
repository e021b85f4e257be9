//! Engine - turns note events into finished PCM blocks.
//!
//! ```text
//!  control thread                    audio thread (generate_block)
//!  ──────────────                    ─────────────────────────────
//!  EngineHandle ──[ NoteEvent ring ]──→ drain at block start
//!                                       │
//!                                       ▼  per internal sample
//!                                  bellows ⇄ reed voices ─→ body
//!                                       │
//!                                       ▼  per block
//!                                  convolver ─→ downsample ─→ post filter
//!                                       │
//!  log_reports ←─[ EngineReport ring ]──┘            normalize ─→ out
//! ```
//!
//! The active voice set only changes while the event ring is drained, so
//! within a block every sample sees the same voices. The audio thread never
//! allocates, locks or logs; anything worth logging goes back through the
//! report ring.

pub mod config;
pub mod handle;
pub mod stage;

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    dsp::{
        body::{BodyConfig, BodyResonator},
        convolver::PartitionedConvolver,
        oversampler::Oversampler,
    },
    error::{Error, Result},
    synth::{
        bellows::{Bellows, BellowsConfig},
        integrator::{Euler, Integrator, Midpoint, RungeKutta4, SemiImplicitEuler, Solver},
        message::{NoteEvent, NoteId},
        poly::{NoteOnOutcome, VoiceManager},
        voice::{ReedOutput, ReedParams},
    },
};

pub use self::config::EngineConfig;
pub use self::handle::{EngineHandle, EngineReport};
pub use self::stage::BlockFilter;

/// Added to the peak before normalizing so silence stays silent.
const NORMALIZE_EPSILON: f32 = 1e-9;

/// Highest playable pitch as a fraction of the internal rate.
const MAX_PITCH_RATIO: f64 = 0.25;

/// Timing of the most recent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStatus {
    pub elapsed: Duration,
    pub budget: Duration,
}

impl BlockStatus {
    pub fn is_underrun(&self) -> bool {
        self.elapsed > self.budget
    }

    /// Fraction of the deadline used.
    pub fn load(&self) -> f64 {
        self.elapsed.as_secs_f64() / self.budget.as_secs_f64()
    }
}

fn report(reports: &mut Producer<EngineReport>, dropped: &mut u64, report: EngineReport) {
    if reports.push(report).is_err() {
        *dropped += 1;
    }
}

pub struct Engine {
    block_size: usize,
    sample_rate: f64,
    dt: f64,
    integrator: Integrator,
    output: ReedOutput,

    voices: VoiceManager,
    bellows: Bellows,
    body: BodyResonator,
    oversampler: Oversampler,
    convolver: Option<PartitionedConvolver>,
    convolution_mix: f32,
    post_filter: Option<Box<dyn BlockFilter>>,
    normalize: bool,
    normalize_floor: f32,

    events: Consumer<NoteEvent>,
    reports: Producer<EngineReport>,

    /// One block at the internal rate.
    internal: Vec<f32>,
    /// Pre-convolution copy for the dry share of the mix.
    dry: Vec<f32>,

    budget: Duration,
    last_status: Option<BlockStatus>,
    underruns: u64,
    faults: u64,
    dropped_reports: u64,
    stopped: bool,
}

impl Engine {
    /// Build an engine from `config` with no post filter.
    pub fn new(config: EngineConfig) -> Result<(Engine, EngineHandle)> {
        EngineBuilder::from_config(config).build()
    }

    /// Render one block of `block_size` output frames into `out`.
    ///
    /// Applies every event queued before the call, then synthesizes. Never
    /// allocates, blocks or logs.
    pub fn generate_block(&mut self, out: &mut [f32]) -> BlockStatus {
        debug_assert_eq!(out.len(), self.block_size);
        let started = Instant::now();

        if self.stopped {
            self.discard_events();
            out.fill(0.0);
            return self.finish(started);
        }

        self.drain_events();

        match self.integrator {
            Integrator::Euler => self.synthesize::<Euler>(),
            Integrator::SemiImplicitEuler => self.synthesize::<SemiImplicitEuler>(),
            Integrator::Midpoint => self.synthesize::<Midpoint>(),
            Integrator::RungeKutta4 => self.synthesize::<RungeKutta4>(),
        }

        if let Some(convolver) = self.convolver.as_mut() {
            let wet = self.convolution_mix;
            if wet < 1.0 {
                self.dry.copy_from_slice(&self.internal);
            }
            convolver.process(&mut self.internal);
            if wet < 1.0 {
                for (y, &d) in self.internal.iter_mut().zip(&self.dry) {
                    *y = wet * *y + (1.0 - wet) * d;
                }
            }
        }

        self.oversampler.downsample_into(&self.internal, out);

        if let Some(filter) = self.post_filter.as_mut() {
            filter.process(out);
        }

        if self.normalize {
            let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            let gain = 1.0 / (peak.max(self.normalize_floor) + NORMALIZE_EPSILON);
            for sample in out.iter_mut() {
                *sample *= gain;
            }
        }

        self.finish(started)
    }

    /// Pop exactly the events present at block start.
    fn drain_events(&mut self) {
        let pending = self.events.slots();
        for _ in 0..pending {
            let Ok(event) = self.events.pop() else {
                break;
            };
            self.apply(event);
        }
    }

    fn discard_events(&mut self) {
        while self.events.pop().is_ok() {}
    }

    fn apply(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { id, frequency } => match self.voices.note_on(id, frequency) {
                NoteOnOutcome::Stole(evicted) => report(
                    &mut self.reports,
                    &mut self.dropped_reports,
                    EngineReport::VoiceStolen { evicted, by: id },
                ),
                NoteOnOutcome::Rejected => report(
                    &mut self.reports,
                    &mut self.dropped_reports,
                    EngineReport::NoteRejected { id, frequency },
                ),
                NoteOnOutcome::Started | NoteOnOutcome::AlreadyActive => {}
            },
            NoteEvent::NoteOff { id } => {
                self.voices.note_off(id);
            }
            NoteEvent::AllNotesOff => self.voices.all_notes_off(),
            NoteEvent::PumpRate { rate } => self.bellows.set_pump_rate(rate),
            NoteEvent::Drone { on } => {
                self.voices.set_drone(on);
            }
        }
    }

    /// The per-sample loop, monomorphized over the integration scheme.
    fn synthesize<S: Solver>(&mut self) {
        let Self {
            voices,
            bellows,
            body,
            internal,
            reports,
            dropped_reports,
            faults,
            dt,
            output,
            ..
        } = self;

        for sample in internal.iter_mut() {
            let pressure = bellows.pressure();
            let mix = voices.step_all::<S, _>(*dt, pressure, *output, |id| {
                *faults += 1;
                report(reports, dropped_reports, EngineReport::VoiceRetired { id });
            });
            bellows.step(mix.airflow);
            *sample = body.process(mix.signal) as f32;
        }
    }

    fn finish(&mut self, started: Instant) -> BlockStatus {
        let status = BlockStatus {
            elapsed: started.elapsed(),
            budget: self.budget,
        };
        if status.is_underrun() {
            self.underruns += 1;
            report(
                &mut self.reports,
                &mut self.dropped_reports,
                EngineReport::Underrun {
                    elapsed_us: status.elapsed.as_micros() as u64,
                    budget_us: status.budget.as_micros() as u64,
                },
            );
        }
        self.last_status = Some(status);
        status
    }

    /// Discard pending events, silence every voice and the drone, and render
    /// silence from now on.
    pub fn stop(&mut self) {
        self.discard_events();
        self.voices.all_notes_off();
        self.voices.set_drone(false);
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Read-only view of the voice set.
    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    pub fn is_active(&self, id: NoteId) -> bool {
        self.voices.contains(id)
    }

    pub fn drone_active(&self) -> bool {
        self.voices.drone_active()
    }

    /// Current bellows pressure.
    pub fn pressure(&self) -> f64 {
        self.bellows.pressure()
    }

    pub fn pump_rate(&self) -> f64 {
        self.bellows.pump_rate()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Output-rate delay added by the oversampler round trip.
    pub fn latency(&self) -> usize {
        self.oversampler.latency()
    }

    pub fn last_status(&self) -> Option<BlockStatus> {
        self.last_status
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Voices retired for numeric divergence.
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Reports lost because the report ring was full.
    pub fn dropped_reports(&self) -> u64 {
        self.dropped_reports
    }
}

/// Fluent construction of an [`Engine`] and its [`EngineHandle`].
///
/// ```no_run
/// use harmonium_dsp::{EngineBuilder, synth::integrator::Integrator};
///
/// let (mut engine, mut handle) = EngineBuilder::new()
///     .sample_rate(44_100.0)
///     .block_size(256)
///     .max_polyphony(8)
///     .integrator(Integrator::RungeKutta4)
///     .seed(7)
///     .build()?;
///
/// handle.note_on(60u8, 261.63)?;
/// let mut block = vec![0.0; engine.block_size()];
/// engine.generate_block(&mut block);
/// # Ok::<(), harmonium_dsp::Error>(())
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    convolver: Option<PartitionedConvolver>,
    post_filter: Option<Box<dyn BlockFilter>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            convolver: None,
            post_filter: None,
        }
    }

    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    pub fn oversample(mut self, factor: usize) -> Self {
        self.config.oversample_factor = factor;
        self
    }

    pub fn oversampler_taps(mut self, taps: usize) -> Self {
        self.config.oversampler_taps = taps;
        self
    }

    pub fn max_polyphony(mut self, voices: usize) -> Self {
        self.config.max_polyphony = voices;
        self
    }

    pub fn integrator(mut self, integrator: Integrator) -> Self {
        self.config.integrator = integrator;
        self
    }

    pub fn output(mut self, output: ReedOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn reed(mut self, reed: ReedParams) -> Self {
        self.config.reed = reed;
        self
    }

    pub fn bellows(mut self, bellows: BellowsConfig) -> Self {
        self.config.bellows = bellows;
        self
    }

    pub fn body(mut self, body: BodyConfig) -> Self {
        self.config.body = body;
        self
    }

    /// Impulse response at the output rate.
    pub fn impulse_response(mut self, ir: Vec<f32>) -> Self {
        self.config.impulse_response = Some(ir);
        self
    }

    /// Use an already-built convolver running at the internal rate. Its
    /// partition must equal the internal block size. Overrides any impulse
    /// response in the config.
    pub fn convolver(mut self, convolver: PartitionedConvolver) -> Self {
        self.convolver = Some(convolver);
        self
    }

    pub fn convolution_mix(mut self, mix: f32) -> Self {
        self.config.convolution_mix = mix;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Lowest peak the normalizer scales up to unity.
    pub fn normalize_floor(mut self, floor: f32) -> Self {
        self.config.normalize_floor = floor;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.event_queue_capacity = capacity;
        self
    }

    pub fn post_filter(mut self, filter: impl BlockFilter + 'static) -> Self {
        self.post_filter = Some(Box::new(filter));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build(self) -> Result<(Engine, EngineHandle)> {
        let EngineBuilder {
            config,
            convolver,
            post_filter,
        } = self;
        config.validate()?;

        let factor = config.oversample_factor;
        let internal_rate = config.internal_rate();
        let internal_block = config.internal_block();
        let dt = 1.0 / internal_rate;

        let oversampler = Oversampler::new(factor, config.oversampler_taps)?;

        let convolver = match (convolver, &config.impulse_response) {
            (Some(convolver), _) => {
                if convolver.partition() != internal_block {
                    return Err(Error::PartitionMismatch {
                        partition: convolver.partition(),
                        block: internal_block,
                    });
                }
                Some(convolver)
            }
            (None, Some(ir)) => {
                let ir = resample_impulse_response(ir, factor, config.oversampler_taps)?;
                Some(PartitionedConvolver::new(&ir, internal_block)?)
            }
            (None, None) => None,
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (event_tx, event_rx) = RingBuffer::new(config.event_queue_capacity);
        let (report_tx, report_rx) = RingBuffer::new(config.report_queue_capacity);

        tracing::info!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            oversample = factor,
            polyphony = config.max_polyphony,
            integrator = ?config.integrator,
            "harmonium engine ready"
        );
        tracing::debug!(
            internal_rate,
            modes = config.body.modes.len(),
            convolver_partitions = convolver.as_ref().map_or(0, PartitionedConvolver::partitions),
            latency = oversampler.latency(),
            seeded = config.seed.is_some(),
            "engine internals"
        );

        let engine = Engine {
            block_size: config.block_size,
            sample_rate: config.sample_rate,
            dt,
            integrator: config.integrator,
            output: config.output,
            voices: VoiceManager::new(config.max_polyphony, config.reed, rng)
                .with_max_frequency(internal_rate * MAX_PITCH_RATIO),
            bellows: Bellows::new(&config.bellows, dt),
            body: BodyResonator::new(&config.body, internal_rate),
            oversampler,
            convolver,
            convolution_mix: config.convolution_mix,
            post_filter,
            normalize: config.normalize,
            normalize_floor: config.normalize_floor,
            events: event_rx,
            reports: report_tx,
            internal: vec![0.0; internal_block],
            dry: vec![0.0; internal_block],
            budget: config.block_duration(),
            last_status: None,
            underruns: 0,
            faults: 0,
            dropped_reports: 0,
            stopped: false,
        };

        Ok((engine, EngineHandle::new(event_tx, report_rx)))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Bring an output-rate impulse response to the internal rate, keeping its
/// convolution gain.
fn resample_impulse_response(ir: &[f32], factor: usize, taps: usize) -> Result<Vec<f32>> {
    if factor == 1 {
        return Ok(ir.to_vec());
    }

    let mut upsampler = Oversampler::new(factor, taps)?;
    // Room for the interpolation filter to ring out
    let mut padded = ir.to_vec();
    padded.resize(ir.len() + upsampler.latency() / 2 + 1, 0.0);

    let scale = 1.0 / factor as f32;
    let mut resampled = upsampler.upsample(&padded);
    for h in resampled.iter_mut() {
        *h *= scale;
    }
    Ok(resampled)
}
