//! Control scalars: two morph faders, two input gains, fader link.
//!
//! [`MorphParams`] is shared between whatever drives the controls and the
//! audio callback. The callback takes one [`ControlSnapshot`] per block.

use crate::lockfree::{AtomicFlag, AtomicFloat};

/// Lock-free control block. All scalars are clamped to `[0, 1]`.
#[derive(Debug)]
pub struct MorphParams {
    morph_a: AtomicFloat,
    morph_b: AtomicFloat,
    source_gain: AtomicFloat,
    reference_gain: AtomicFloat,
    link: AtomicFlag,
}

impl Default for MorphParams {
    fn default() -> Self {
        Self {
            morph_a: AtomicFloat::new(0.0),
            morph_b: AtomicFloat::new(0.0),
            source_gain: AtomicFloat::new(1.0),
            reference_gain: AtomicFloat::new(1.0),
            link: AtomicFlag::new(false),
        }
    }
}

impl MorphParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn morph_a(&self) -> f32 {
        self.morph_a.get()
    }

    pub fn set_morph_a(&self, value: f32) {
        self.morph_a.set_clamped(value, 0.0, 1.0);
    }

    pub fn morph_b(&self) -> f32 {
        self.morph_b.get()
    }

    pub fn set_morph_b(&self, value: f32) {
        self.morph_b.set_clamped(value, 0.0, 1.0);
    }

    pub fn source_gain(&self) -> f32 {
        self.source_gain.get()
    }

    pub fn set_source_gain(&self, value: f32) {
        self.source_gain.set_clamped(value, 0.0, 1.0);
    }

    pub fn reference_gain(&self) -> f32 {
        self.reference_gain.get()
    }

    pub fn set_reference_gain(&self, value: f32) {
        self.reference_gain.set_clamped(value, 0.0, 1.0);
    }

    pub fn link(&self) -> bool {
        self.link.get()
    }

    pub fn set_link(&self, on: bool) {
        self.link.set(on);
    }

    #[inline]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            morph_a: self.morph_a(),
            morph_b: self.morph_b(),
            source_gain: self.source_gain(),
            reference_gain: self.reference_gain(),
        }
    }
}

/// Control values captured for one inference request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub morph_a: f32,
    pub morph_b: f32,
    pub source_gain: f32,
    pub reference_gain: f32,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            morph_a: 0.0,
            morph_b: 0.0,
            source_gain: 1.0,
            reference_gain: 1.0,
        }
    }
}

impl ControlSnapshot {
    #[inline]
    pub fn fader_sum(&self) -> f32 {
        self.morph_a + self.morph_b
    }
}

/// Two-way binding between the morph faders while link mode is on.
///
/// Each block, a fader that moved since the previous block is copied onto the
/// other. If both moved in the same block, fader A wins.
#[derive(Debug, Default)]
pub struct FaderLink {
    prev_a: f32,
    prev_b: f32,
}

impl FaderLink {
    pub fn new(params: &MorphParams) -> Self {
        let mut link = Self::default();
        link.reset(params);
        link
    }

    /// Forget history; the current values become the baseline.
    pub fn reset(&mut self, params: &MorphParams) {
        self.prev_a = params.morph_a();
        self.prev_b = params.morph_b();
    }

    /// Run once per block.
    pub fn apply(&mut self, params: &MorphParams) {
        let a = params.morph_a();
        let b = params.morph_b();
        let (linked_a, linked_b) = self.mirror(params.link(), a, b);
        if linked_a != a {
            params.set_morph_a(linked_a);
        }
        if linked_b != b {
            params.set_morph_b(linked_b);
        }
    }

    /// Resolve one block from the fader values read for it and return the
    /// values to publish.
    ///
    /// The baseline for the next block is what this block read or wrote. A
    /// control write landing after the read is therefore still seen as a
    /// change next block and gets mirrored then.
    pub fn mirror(&mut self, link: bool, a: f32, b: f32) -> (f32, f32) {
        let linked = match link {
            true if a != self.prev_a => (a, a),
            true if b != self.prev_b => (b, b),
            _ => (a, b),
        };
        (self.prev_a, self.prev_b) = linked;
        linked
    }
}
