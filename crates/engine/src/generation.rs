//! Per-category input generations.
//!
//! The UI thread stamps every move/touch/key event with a fresh generation before handing it
//! to the content thread. Work started for generation `g` is thrown away when the live counter
//! has moved past `g` by the time the work completes. Counters only ever increase.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    Move,
    Touch,
    Text,
}

#[derive(Debug, Default)]
pub struct GenerationSequencer {
    move_generation: AtomicU64,
    touch_generation: AtomicU64,
    text_generation: AtomicU64,
    last_generation: AtomicU64,
}

impl GenerationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: GenerationKind) -> &AtomicU64 {
        match kind {
            GenerationKind::Move => &self.move_generation,
            GenerationKind::Touch => &self.touch_generation,
            GenerationKind::Text => &self.text_generation,
        }
    }

    /// Allocates the next generation of `kind`.
    pub fn advance(&self, kind: GenerationKind) -> Generation {
        let previous = self.counter(kind).fetch_add(1, Ordering::AcqRel);
        Generation(
            previous
                .checked_add(1)
                .unwrap_or_else(|| panic!("{kind:?} generation overflow")),
        )
    }

    /// Raises the live counter to at least `generation`; lower values are ignored.
    pub fn observe(&self, kind: GenerationKind, generation: Generation) -> Generation {
        let previous = self.counter(kind).fetch_max(generation.0, Ordering::AcqRel);
        Generation(previous.max(generation.0))
    }

    pub fn current(&self, kind: GenerationKind) -> Generation {
        Generation(self.counter(kind).load(Ordering::Acquire))
    }

    /// True when no newer event of `kind` has been generated since `generation`.
    pub fn is_current(&self, kind: GenerationKind, generation: Generation) -> bool {
        self.current(kind) <= generation
    }

    pub fn mark_last(&self, generation: Generation) {
        self.last_generation
            .fetch_max(generation.0, Ordering::AcqRel);
    }

    pub fn last(&self) -> Generation {
        Generation(self.last_generation.load(Ordering::Acquire))
    }
}
