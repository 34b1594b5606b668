// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The computational core of a targeted facet imager.

`facetgrid` turns irregularly-sampled complex visibilities from a radio
interferometer into per-facet dirty images. The pipeline is: per-facet
baseline rotation and phase shift, convolutional gridding of weighted
visibilities onto complex u-v grids, then an in-place inverse FFT and
real-part repack of each grid plane. A parallel pipeline accumulates the
sampling function (dirty beam).

Measurement-set reading, FITS writing and the command-line driver are
external collaborators; this crate only consumes the borrowed arrays they
provide (see [`GriddingParameters`]) and mutates the caller-owned grid
cubes.
*/

pub mod cancel;
pub mod constants;
pub mod coord;
pub mod error;
pub mod facet;
pub mod fft;
pub mod grid;
pub mod kernel;
pub(crate) mod math;
pub mod stokes;

// Re-exports.
pub use cancel::CancellationToken;
pub use error::FacetGridError;
pub use fft::IfftMachine;
pub use grid::{
    grid_sampling_function, grid_visibilities, ConvolutionSelection, CorrelationSelection,
    GriddingParameters, GriddingStats,
};
pub use kernel::ConvolutionKernel;

/// A single-precision complex number. Visibilities and grid samples use this
/// type.
#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex<f32>;

/// A double-precision complex number. Phase factors are computed in double
/// precision before being demoted.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;
