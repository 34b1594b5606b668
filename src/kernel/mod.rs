// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The anti-aliasing convolution kernel.

The gridder convolves every visibility with a separable 1-D finite impulse
response, tabulated at `oversample` fractional phases per grid cell. For a
half-support of `S` cells the FIR holds `(2S + 3) * oversample` taps: the
full support is `2S + 1` cells, and one extra cell is reserved at either end
so that the +/- half-cell fractional offset of a rounded visibility can
never index outside the table.

Tap `i` samples the window function at a cell offset of
`i / oversample - (S + 2.5)`; the stride-`oversample` walk used by the
gridder then lands each of its `2S + 1` reads on the tap closest to the
geometric offset between the deposit cell and the visibility.
 */

use crate::error::ConfigurationError;
use crate::math::sinc;

/// A precomputed, oversampled gridding FIR. Computed once and shared
/// read-only for the whole run.
#[derive(Clone, Debug)]
pub struct ConvolutionKernel {
    taps: Vec<f32>,
    support: usize,
    oversample: usize,
}

impl ConvolutionKernel {
    /// Wrap caller-supplied taps, checking the shape invariants.
    pub fn from_taps(
        taps: Vec<f32>,
        support: usize,
        oversample: usize,
    ) -> Result<Self, ConfigurationError> {
        if support < 1 {
            return Err(ConfigurationError::ConvolutionSupport(support));
        }
        if oversample < 1 {
            return Err(ConfigurationError::ConvolutionOversample(oversample));
        }
        let expected = Self::num_taps(support, oversample);
        if taps.len() != expected {
            return Err(ConfigurationError::ConvolutionFirLength {
                support,
                oversample,
                expected,
                got: taps.len(),
            });
        }
        Ok(Self {
            taps,
            support,
            oversample,
        })
    }

    /// The number of taps a FIR with this shape must have.
    pub fn num_taps(support: usize, oversample: usize) -> usize {
        (2 * support + 3) * oversample
    }

    /// An unnormalized sinc window (the removable singularity at 0 is 1).
    pub fn sinc(support: usize, oversample: usize) -> Result<Self, ConfigurationError> {
        Self::tabulate(support, oversample, |x| sinc(x) as f32)
    }

    /// A Gaussian window. The width tracks the support via the same
    /// regression the on-the-fly kernel family uses, so small kernels taper
    /// sensibly.
    pub fn gaussian(support: usize, oversample: usize) -> Result<Self, ConfigurationError> {
        let full_support = (2 * support + 1) as f64;
        let sigma = 0.0349 * full_support + 0.37175;
        Self::tabulate(support, oversample, |x| {
            (-0.5 * (x / sigma) * (x / sigma)).exp() as f32
        })
    }

    /// A constant unit tap at every sample. Its stride-`oversample` mass is
    /// exactly `2S + 1` per axis for any fractional phase, which makes it
    /// the kernel of choice for acceptance tests.
    pub fn top_hat(support: usize, oversample: usize) -> Result<Self, ConfigurationError> {
        Self::tabulate(support, oversample, |_| 1.0)
    }

    fn tabulate(
        support: usize,
        oversample: usize,
        f: impl Fn(f64) -> f32,
    ) -> Result<Self, ConfigurationError> {
        if support < 1 {
            return Err(ConfigurationError::ConvolutionSupport(support));
        }
        if oversample < 1 {
            return Err(ConfigurationError::ConvolutionOversample(oversample));
        }
        let centre = (support as f64 + 2.5) * oversample as f64;
        let taps = (0..Self::num_taps(support, oversample))
            .map(|i| f((i as f64 - centre) / oversample as f64))
            .collect();
        Ok(Self {
            taps,
            support,
            oversample,
        })
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    pub fn support(&self) -> usize {
        self.support
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }

    /// The total weight a single convolve deposits along one axis for the
    /// given oversampled phase: the sum of the `2S + 1` stride-`oversample`
    /// taps starting one cell above the phase.
    pub fn total_mass(&self, oversampled_phase: usize) -> f32 {
        (1..=2 * self.support + 1)
            .map(|s| self.taps[oversampled_phase + s * self.oversample])
            .sum()
    }
}
