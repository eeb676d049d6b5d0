//! Bordered height sample grid
//!
//! A chunk's heights arrive as a square grid with one extra ring of samples
//! on every side. The ring belongs to the neighbouring chunks and is only
//! used to finish vertex normals along the chunk edge.

use rayon::prelude::*;

use crate::core::{Error, Result};

/// Square, row-major grid of height samples including the border ring.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightSampleGrid {
    size: usize,
    samples: Vec<f32>,
}

impl HeightSampleGrid {
    /// Wrap `size * size` row-major samples
    pub fn from_samples(size: usize, samples: Vec<f32>) -> Result<Self> {
        let expected = size * size;
        if samples.len() != expected {
            return Err(Error::SampleCount { expected, actual: samples.len() });
        }
        Ok(Self { size, samples })
    }

    /// Fill a grid by evaluating `f(x, y)` for every sample
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut samples = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                samples.push(f(x, y));
            }
        }
        Self { size, samples }
    }

    /// Like [`from_fn`](Self::from_fn) but fills rows in parallel.
    pub fn from_fn_par<F>(size: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f32 + Sync,
    {
        let mut samples = vec![0.0; size * size];
        if size > 0 {
            samples
                .par_chunks_mut(size)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, sample) in row.iter_mut().enumerate() {
                        *sample = f(x, y);
                    }
                });
        }
        Self { size, samples }
    }

    /// Side length including the border ring
    pub fn bordered_size(&self) -> usize {
        self.size
    }

    /// Side length of the chunk itself (border ring excluded)
    pub fn chunk_sample_size(&self) -> usize {
        self.size.saturating_sub(2)
    }

    /// Sample at column `x`, row `y`
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.samples[y * self.size + x]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// True if `(x, y)` lies on the outermost ring
    #[inline]
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        let last = self.size - 1;
        x == 0 || y == 0 || x == last || y == last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_checks_length() {
        assert!(HeightSampleGrid::from_samples(3, vec![0.0; 9]).is_ok());
        let err = HeightSampleGrid::from_samples(3, vec![0.0; 8]).unwrap_err();
        assert!(matches!(err, Error::SampleCount { expected: 9, actual: 8 }));
    }

    #[test]
    fn test_row_major_layout() {
        let grid = HeightSampleGrid::from_fn(4, |x, y| (y * 10 + x) as f32);
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(3, 0), 3.0);
        assert_eq!(grid.get(1, 2), 21.0);
        assert_eq!(grid.samples()[2 * 4 + 1], 21.0);
    }

    #[test]
    fn test_parallel_fill_matches_serial() {
        let f = |x: usize, y: usize| (x as f32 * 0.3).sin() + y as f32;
        let serial = HeightSampleGrid::from_fn(17, f);
        let parallel = HeightSampleGrid::from_fn_par(17, f);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_border_ring() {
        let grid = HeightSampleGrid::from_fn(5, |_, _| 0.0);
        assert_eq!(grid.chunk_sample_size(), 3);
        assert!(grid.is_border(0, 2));
        assert!(grid.is_border(4, 4));
        assert!(grid.is_border(2, 0));
        assert!(!grid.is_border(1, 1));
        assert!(!grid.is_border(3, 3));
    }
}
