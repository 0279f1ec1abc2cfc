//! Stereo sample value type.

use std::ops::{Add, AddAssign, Mul, Sub};

/// A pair of left/right amplitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct StereoSample {
    pub l: f32,
    pub r: f32,
}

impl StereoSample {
    pub const SILENCE: Self = Self { l: 0.0, r: 0.0 };

    #[inline]
    pub const fn new(l: f32, r: f32) -> Self {
        Self { l, r }
    }

    /// Same value on both channels.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { l: v, r: v }
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.l == 0.0 && self.r == 0.0
    }
}

impl Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.l + rhs.l, self.r + rhs.r)
    }
}

impl Add<f32> for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, rhs: f32) -> Self {
        Self::new(self.l + rhs, self.r + rhs)
    }
}

impl AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.l += rhs.l;
        self.r += rhs.r;
    }
}

impl Sub for StereoSample {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.l - rhs.l, self.r - rhs.r)
    }
}

impl Sub<f32> for StereoSample {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: f32) -> Self {
        Self::new(self.l - rhs, self.r - rhs)
    }
}

impl Mul for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.l * rhs.l, self.r * rhs.r)
    }
}

impl Mul<f32> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.l * rhs, self.r * rhs)
    }
}

impl From<(f32, f32)> for StereoSample {
    fn from((l, r): (f32, f32)) -> Self {
        Self::new(l, r)
    }
}

/// True when every sample in `window` is exactly zero on both channels.
pub fn is_silent(window: &[StereoSample]) -> bool {
    window.iter().all(StereoSample::is_silent)
}
