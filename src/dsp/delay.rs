/// Waveguide cavity: a fixed-length delay line whose output is fed back
/// through a one-pole lowpass.
///
/// ```text
/// input ──→ (+) ──→ [ z^-L ] ──┬──→ output
///            ↑                 │
///            └── feedback · LP ┘
/// ```
///
/// The buffer is allocated once at construction; `process` never allocates.
pub struct Waveguide {
    buffer: Vec<f64>,
    write_pos: usize,
    feedback: f64,
    damping: f64,
    filter_state: f64,
}

impl Waveguide {
    /// `length` is clamped to at least one sample. `feedback` should be in
    /// `[0, 1)` for a stable loop; `damping` in `[0, 1]` (0 = no lowpass).
    pub fn new(length: usize, feedback: f64, damping: f64) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            write_pos: 0,
            feedback,
            damping: damping.clamp(0.0, 1.0),
            filter_state: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer[self.write_pos];

        self.filter_state = delayed * (1.0 - self.damping) + self.filter_state * self.damping;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;

        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }

        delayed
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn feedback(&self) -> f64 {
        self.feedback
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}
