use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::synth::{
    integrator::Solver,
    message::NoteId,
    voice::{ReedOutput, ReedParams, ReedVoice},
};

/// What a note-on did to the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOnOutcome {
    /// A free slot took the note.
    Started,
    /// The id was already sounding. Nothing changed.
    AlreadyActive,
    /// The oldest voice was evicted to make room.
    Stole(NoteId),
    /// The frequency is not playable or there are no slots. Nothing changed.
    Rejected,
}

/// Summed output of every active voice for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoiceMix {
    pub signal: f64,
    pub airflow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Active,
}

struct Slot {
    state: SlotState,
    /// Allocation stamp. Lower is older.
    age: u64,
    voice: Option<ReedVoice>,
}

/// Ids and pitches of the drone stops (Sa, Pa, upper Sa). The ids sit at
/// the top of the range so they never collide with keyboard notes.
pub const DRONE_STOPS: [(NoteId, f64); 3] = [
    (NoteId(u32::MAX - 2), 261.63),
    (NoteId(u32::MAX - 1), 392.00),
    (NoteId(u32::MAX), 523.25),
];

/// Owns every sounding reed, keyed by note id, bounded to `capacity` voices.
///
/// Slots are allocated up front so note events never allocate on the audio
/// thread. When full, the voice with the lowest allocation stamp is evicted
/// (FIFO by allocation, not by musical duration).
///
/// Drone stops live outside the slots: they neither count against capacity
/// nor get stolen, and only [`set_drone`](Self::set_drone) or divergence
/// silences them.
pub struct VoiceManager {
    slots: Vec<Slot>,
    next_age: u64,
    active: usize,
    drones: Vec<ReedVoice>,
    max_frequency: f64,
    params: ReedParams,
    rng: StdRng,
}

impl VoiceManager {
    pub fn new(capacity: usize, params: ReedParams, rng: StdRng) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                state: SlotState::Free,
                age: 0,
                voice: None,
            })
            .collect();

        Self {
            slots,
            next_age: 0,
            active: 0,
            drones: Vec::with_capacity(DRONE_STOPS.len()),
            max_frequency: f64::INFINITY,
            params,
            rng,
        }
    }

    /// Refuse note-ons above `hz`. Reeds tuned near the step rate cannot be
    /// integrated stably.
    pub fn with_max_frequency(mut self, hz: f64) -> Self {
        self.max_frequency = hz;
        self
    }

    pub fn max_frequency(&self) -> f64 {
        self.max_frequency
    }

    pub fn with_seed(capacity: usize, params: ReedParams, seed: u64) -> Self {
        Self::new(capacity, params, StdRng::seed_from_u64(seed))
    }

    pub fn note_on(&mut self, id: NoteId, frequency: f64) -> NoteOnOutcome {
        if !(frequency > 0.0 && frequency <= self.max_frequency) {
            return NoteOnOutcome::Rejected;
        }
        if self.find(id).is_some() {
            return NoteOnOutcome::AlreadyActive;
        }

        let (idx, outcome) = match self.slots.iter().position(|s| s.state == SlotState::Free) {
            Some(idx) => (idx, NoteOnOutcome::Started),
            None => match self.oldest() {
                Some(idx) => {
                    let stolen = self.release_slot(idx);
                    (idx, NoteOnOutcome::Stole(stolen))
                }
                None => return NoteOnOutcome::Rejected,
            },
        };

        let voice = ReedVoice::new(id, frequency, &self.params, &mut self.rng);
        let slot = &mut self.slots[idx];
        slot.state = SlotState::Active;
        slot.age = self.next_age;
        slot.voice = Some(voice);
        self.next_age += 1;
        self.active += 1;

        outcome
    }

    /// Returns false (and changes nothing) if `id` was not sounding.
    pub fn note_off(&mut self, id: NoteId) -> bool {
        match self.find(id) {
            Some(idx) => {
                self.release_slot(idx);
                true
            }
            None => false,
        }
    }

    pub fn all_notes_off(&mut self) {
        for idx in 0..self.slots.len() {
            if self.slots[idx].state == SlotState::Active {
                self.release_slot(idx);
            }
        }
    }

    /// Sound or silence the drone stops. Returns true if the state changed.
    pub fn set_drone(&mut self, on: bool) -> bool {
        if on == self.drone_active() {
            return false;
        }
        self.drones.clear();
        if on {
            for (id, frequency) in DRONE_STOPS {
                let voice = ReedVoice::new(id, frequency, &self.params, &mut self.rng);
                self.drones.push(voice);
            }
        }
        true
    }

    /// True while at least one drone reed is sounding.
    pub fn drone_active(&self) -> bool {
        !self.drones.is_empty()
    }

    pub fn drone_count(&self) -> usize {
        self.drones.len()
    }

    /// Step every active voice and drone once and sum their output and
    /// airflow.
    ///
    /// A voice whose state diverges is retired on the spot and `on_fault` is
    /// told its id; the remaining voices still contribute to this sample.
    #[inline]
    pub fn step_all<S, F>(
        &mut self,
        dt: f64,
        pressure: f64,
        output: ReedOutput,
        mut on_fault: F,
    ) -> VoiceMix
    where
        S: Solver,
        F: FnMut(NoteId),
    {
        let mut mix = VoiceMix::default();
        if self.active == 0 && self.drones.is_empty() {
            return mix;
        }

        self.drones.retain_mut(|voice| match voice.step_with::<S>(dt, pressure, output) {
            Ok(step) => {
                mix.signal += step.sample;
                mix.airflow += step.airflow;
                true
            }
            Err(fault) => {
                on_fault(fault.id);
                false
            }
        });

        for slot in self.slots.iter_mut() {
            let Some(voice) = slot.voice.as_mut() else {
                continue;
            };
            match voice.step_with::<S>(dt, pressure, output) {
                Ok(step) => {
                    mix.signal += step.sample;
                    mix.airflow += step.airflow;
                }
                Err(fault) => {
                    slot.voice = None;
                    slot.state = SlotState::Free;
                    self.active -= 1;
                    on_fault(fault.id);
                }
            }
        }

        mix
    }

    /// Active voices, in slot order. Drones are not included.
    pub fn voices(&self) -> impl Iterator<Item = &ReedVoice> {
        self.slots.iter().filter_map(|s| s.voice.as_ref())
    }

    /// Active note ids, oldest allocation first.
    pub fn ids_by_age(&self) -> Vec<NoteId> {
        let mut active: Vec<(u64, NoteId)> = self
            .slots
            .iter()
            .filter_map(|s| s.voice.as_ref().map(|v| (s.age, v.id())))
            .collect();
        active.sort_unstable_by_key(|(age, _)| *age);
        active.into_iter().map(|(_, id)| id).collect()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn find(&self, id: NoteId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.voice.as_ref().is_some_and(|v| v.id() == id))
    }

    fn oldest(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == SlotState::Active)
            .min_by_key(|(_, s)| s.age)
            .map(|(idx, _)| idx)
    }

    fn release_slot(&mut self, idx: usize) -> NoteId {
        let slot = &mut self.slots[idx];
        slot.state = SlotState::Free;
        let id = slot.voice.take().map(|v| v.id()).unwrap_or(NoteId(0));
        self.active -= 1;
        id
    }
}
