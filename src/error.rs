// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types for all facetgrid-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacetGridError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Fft(#[from] crate::fft::FftError),

    #[error("The run was cancelled; the grid cubes do not contain a usable result")]
    Cancelled,
}

/// Problems with the gridding configuration, all surfaced before the first
/// row is touched. Out-of-grid visibilities and flagged or disabled samples
/// are not errors; they are counted in
/// [`GriddingStats`](crate::grid::GriddingStats).
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("The convolution half-support must be at least 1 (got {0})")]
    ConvolutionSupport(usize),

    #[error("The convolution oversampling factor must be at least 1 (got {0})")]
    ConvolutionOversample(usize),

    #[error("The convolution FIR must have (2 x {support} + 3) x {oversample} = {expected} taps, but has {got}")]
    ConvolutionFirLength {
        support: usize,
        oversample: usize,
        expected: usize,
        got: usize,
    },

    #[error("A {nx}x{ny} grid cannot hold a half-support-{support} kernel; both dimensions must be at least {min}")]
    GridTooSmall {
        nx: usize,
        ny: usize,
        support: usize,
        min: usize,
    },

    #[error("The facet table is empty; at least the reference direction is required")]
    NoFacets,

    #[error("baseline_starting_indexes must have baseline_count + 1 = {expected} entries (the sentinel holds the total row count), but has {got}")]
    BaselineIndexLength { expected: usize, got: usize },

    #[error("baseline_starting_indexes is not monotonically non-decreasing at entry {index}")]
    BaselineIndexNotMonotonic { index: usize },

    #[error("The baseline_starting_indexes sentinel is {got}, but row_count is {expected}")]
    BaselineIndexSentinel { expected: usize, got: usize },

    #[error("Array {name} has {got} elements; expected {expected}")]
    ArrayLength {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Enabled channel (spw {spw}, channel {channel}) has grid index {grid_index}, outside the {num_grid_channels} grid channel(s)")]
    ChannelGridIndex {
        spw: usize,
        channel: usize,
        grid_index: usize,
        num_grid_channels: usize,
    },

    #[error("Polarization index {index} is outside the {count} correlation(s) present in the data")]
    PolarizationIndex { index: usize, count: usize },

    #[error("{required} correlations are required for this gridding mode, but the data carries {got}")]
    NotEnoughCorrelations { required: usize, got: usize },
}
