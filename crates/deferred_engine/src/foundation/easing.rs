//! Easing curves for camera blends
//!
//! Each family defines its ease-in shape; ease-out and ease-in-out are
//! derived from it by reflection, so every curve maps 0 to 0 and 1 to 1.

use serde::{Deserialize, Serialize};

use super::math::constants::PI;

/// Which end of the curve is eased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EaseMode {
    /// Slow start
    In,
    /// Slow finish
    Out,
    /// Slow start and finish
    InOut,
}

/// Curve applied to a blend weight before interpolating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Easing {
    #[default]
    Linear,
    Quad(EaseMode),
    Cubic(EaseMode),
    Quart(EaseMode),
    Quint(EaseMode),
    Sine(EaseMode),
    Expo(EaseMode),
    Circ(EaseMode),
    Back(EaseMode),
    Elastic(EaseMode),
    Bounce(EaseMode),
}

impl Easing {
    /// Map `t` in `[0, 1]` through the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let (ease_in, mode): (fn(f32) -> f32, EaseMode) = match self {
            Self::Linear => return t,
            Self::Quad(mode) => (|t: f32| t * t, mode),
            Self::Cubic(mode) => (|t: f32| t * t * t, mode),
            Self::Quart(mode) => (|t: f32| t.powi(4), mode),
            Self::Quint(mode) => (|t: f32| t.powi(5), mode),
            Self::Sine(mode) => (sine_in, mode),
            Self::Expo(mode) => (expo_in, mode),
            Self::Circ(mode) => (|t: f32| 1.0 - (1.0 - t * t).max(0.0).sqrt(), mode),
            Self::Back(mode) => (back_in, mode),
            Self::Elastic(mode) => (elastic_in, mode),
            Self::Bounce(mode) => (|t: f32| 1.0 - bounce_out(1.0 - t), mode),
        };

        match mode {
            EaseMode::In => ease_in(t),
            EaseMode::Out => 1.0 - ease_in(1.0 - t),
            EaseMode::InOut if t < 0.5 => ease_in(2.0 * t) * 0.5,
            EaseMode::InOut => 1.0 - ease_in(2.0 - 2.0 * t) * 0.5,
        }
    }
}

fn sine_in(t: f32) -> f32 {
    1.0 - (t * PI * 0.5).cos()
}

fn expo_in(t: f32) -> f32 {
    if t <= 0.0 { 0.0 } else { 2.0_f32.powf(10.0f32.mul_add(t, -10.0)) }
}

fn back_in(t: f32) -> f32 {
    const C1: f32 = 1.70158;
    const C3: f32 = C1 + 1.0;
    C3 * t * t * t - C1 * t * t
}

fn elastic_in(t: f32) -> f32 {
    const C4: f32 = 2.0 * PI / 3.0;
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else {
        -(2.0_f32.powf(10.0f32.mul_add(t, -10.0))) * ((t * 10.0 - 10.75) * C4).sin()
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984_375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_curves() -> Vec<Easing> {
        let mut curves = vec![Easing::Linear];
        for mode in [EaseMode::In, EaseMode::Out, EaseMode::InOut] {
            curves.extend([
                Easing::Quad(mode),
                Easing::Cubic(mode),
                Easing::Quart(mode),
                Easing::Quint(mode),
                Easing::Sine(mode),
                Easing::Expo(mode),
                Easing::Circ(mode),
                Easing::Back(mode),
                Easing::Elastic(mode),
                Easing::Bounce(mode),
            ]);
        }
        curves
    }

    #[test]
    fn test_endpoints_are_fixed() {
        for curve in all_curves() {
            assert!(curve.apply(0.0).abs() < 1e-3, "{curve:?} at 0 = {}", curve.apply(0.0));
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-3, "{curve:?} at 1 = {}", curve.apply(1.0));
        }
    }

    #[test]
    fn test_in_out_symmetry() {
        let quad = Easing::Quad(EaseMode::InOut);
        assert!((quad.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((quad.apply(0.25) + quad.apply(0.75) - 1.0).abs() < 1e-6);
        assert!(Easing::Quad(EaseMode::In).apply(0.5) < 0.5);
        assert!(Easing::Quad(EaseMode::Out).apply(0.5) > 0.5);
    }
}
