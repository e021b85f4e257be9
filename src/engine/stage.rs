//! Pluggable block filter run after the synthesis chain, before normalization.
//!
//! Meant for frozen coloration models: stateless or self-contained,
//! deterministic, same block in and out. The engine never inspects it.

pub trait BlockFilter: Send {
    /// Transform `block` in place. Must not allocate or block.
    fn process(&mut self, block: &mut [f32]);
}

/// Leaves the block untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl BlockFilter for Identity {
    fn process(&mut self, _block: &mut [f32]) {}
}

/// Constant gain, handy as a stand-in in tests.
#[derive(Debug, Clone, Copy)]
pub struct Gain(pub f32);

impl BlockFilter for Gain {
    fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample *= self.0;
        }
    }
}

impl<F> BlockFilter for F
where
    F: FnMut(&mut [f32]) + Send,
{
    fn process(&mut self, block: &mut [f32]) {
        self(block)
    }
}
