//! Height remap curve
//!
//! Raw height samples are pushed through a curve before being scaled, which
//! lets flat water/lowland regions stay flat while peaks keep their relief.
//! The curve is a piecewise-linear list of `(input, output)` keys, clamped
//! outside the key range. An empty curve is the identity.

use serde::{Deserialize, Serialize};

/// Any height remap the mesh builder can apply.
///
/// Implemented by [`HeightCurve`] and by plain `Fn(f32) -> f32` closures, for
/// remaps that are smooth or computed rather than keyed.
pub trait HeightRemap {
    fn remap(&self, height: f32) -> f32;
}

impl<F> HeightRemap for F
where
    F: Fn(f32) -> f32,
{
    fn remap(&self, height: f32) -> f32 {
        self(height)
    }
}

impl HeightRemap for HeightCurve {
    fn remap(&self, height: f32) -> f32 {
        self.evaluate(height)
    }
}

/// Piecewise-linear remap applied to every height sample before scaling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    /// Keys sorted by input value
    keys: Vec<[f32; 2]>,
}

impl HeightCurve {
    /// Curve that returns its input unchanged
    pub fn identity() -> Self {
        Self { keys: Vec::new() }
    }

    /// Build a curve from `(input, output)` keys in any order.
    ///
    /// Keys with a NaN component are dropped.
    pub fn from_keys(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<[f32; 2]> = keys
            .into_iter()
            .filter(|(i, o)| !i.is_nan() && !o.is_nan())
            .map(|(i, o)| [i, o])
            .collect();
        keys.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self { keys }
    }

    /// Curve keys as `[input, output]` pairs, sorted by input
    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    pub fn is_identity(&self) -> bool {
        self.keys.is_empty()
    }

    /// Evaluate the curve at `x`
    pub fn evaluate(&self, x: f32) -> f32 {
        let keys = &self.keys;
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return x;
        };

        if x <= first[0] {
            return first[1];
        }
        if x >= last[0] {
            return last[1];
        }

        // First key strictly above x; x > first[0] so idx >= 1
        let idx = keys.partition_point(|k| k[0] <= x);
        let [x0, y0] = keys[idx - 1];
        let [x1, y1] = keys[idx];
        let span = x1 - x0;
        if span <= f32::EPSILON {
            return y1;
        }
        let t = (x - x0) / span;
        y0 + (y1 - y0) * t
    }
}
