// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The gridding parameter record.

use itertools::Itertools;

use crate::c32;
use crate::coord::{RADec, UVW};
use crate::error::ConfigurationError;
use crate::kernel::ConvolutionKernel;

/// Everything a gridding run consumes, in one record: borrowed read-only
/// input arrays, caller-owned output buffers and the scalars that describe
/// their shapes. The lifetime ties every borrowed array to the record for
/// the duration of the run.
///
/// Array layouts:
/// - per-row arrays (`uvw_coords`, `flagged_rows`, `field_array`,
///   `spw_index_array`) have `row_count` entries, rows grouped per baseline
///   by `baseline_starting_indexes`;
/// - the visibility, weight and flag arrays are `[row][channel][pol]` with
///   `channel_count * polarization_count` entries per row;
/// - the per-channel tables (`reference_wavelengths`, `enabled_channels`,
///   `channel_grid_indices`) are `[spw][channel]`;
/// - `output_buffer` is `[facet][grid channel][pol][ny][nx]` complex;
///   `sampling_function_buffer` is `[facet][psf channel][ny][nx]` complex.
///   After the IFFT repack stage both hold `f32` image planes in the first
///   `nx * ny` floats of each plane.
pub struct GriddingParameters<'a> {
    // Input arrays, borrowed and read-only.
    pub visibilities: &'a [c32],
    pub visibility_weights: &'a [f32],
    pub flagged_visibilities: &'a [bool],
    pub flagged_rows: &'a [bool],
    pub field_array: &'a [u32],
    pub spw_index_array: &'a [usize],
    pub uvw_coords: &'a [UVW],
    /// Reference wavelength of each (spw, channel) [metres].
    pub reference_wavelengths: &'a [f64],
    pub enabled_channels: &'a [bool],
    /// Which grid plane each enabled (spw, channel) accumulates into; this
    /// is what implements band averaging.
    pub channel_grid_indices: &'a [usize],
    /// Prefix sum of rows per baseline, with a final sentinel equal to
    /// `row_count`.
    pub baseline_starting_indexes: &'a [usize],
    /// Facet centres; the first entry is the reference direction.
    pub facet_centres: &'a [RADec],
    /// The precomputed FIR taps (see [`ConvolutionKernel`]).
    pub conv: &'a [f32],

    // Output buffers, owned by the caller and mutated here.
    pub output_buffer: &'a mut [c32],
    pub sampling_function_buffer: &'a mut [c32],

    // Scalars.
    pub nx: usize,
    pub ny: usize,
    /// Cell size in l [arcseconds].
    pub cell_size_x: f64,
    /// Cell size in m [arcseconds].
    pub cell_size_y: f64,
    /// The FIR integer half-support.
    pub conv_support: usize,
    /// The FIR oversampling factor.
    pub conv_oversample: usize,
    pub spw_count: usize,
    pub channel_count: usize,
    /// Correlations present in the data per (row, channel).
    pub polarization_count: usize,
    pub baseline_count: usize,
    pub row_count: usize,
    /// Grid planes per polarization in the image cube.
    pub cube_channel_dim_size: usize,
    /// Grid planes in the sampling-function cube.
    pub sampling_function_channel_count: usize,
    pub phase_centre: RADec,
    pub imaging_field: u32,
}

/// The read-only half of [`GriddingParameters`], copied out so that the
/// output buffer can be split into per-facet slabs while the facet workers
/// share the inputs.
#[derive(Clone, Copy)]
pub(crate) struct VisibilityInputs<'a> {
    pub(crate) visibilities: &'a [c32],
    pub(crate) visibility_weights: &'a [f32],
    pub(crate) flagged_visibilities: &'a [bool],
    pub(crate) flagged_rows: &'a [bool],
    pub(crate) field_array: &'a [u32],
    pub(crate) spw_index_array: &'a [usize],
    pub(crate) uvw_coords: &'a [UVW],
    pub(crate) reference_wavelengths: &'a [f64],
    pub(crate) enabled_channels: &'a [bool],
    pub(crate) channel_grid_indices: &'a [usize],
    pub(crate) baseline_starting_indexes: &'a [usize],
    pub(crate) conv: &'a [f32],
    pub(crate) conv_support: usize,
    pub(crate) conv_oversample: usize,
    pub(crate) nx: usize,
    pub(crate) ny: usize,
    pub(crate) cell_size_x: f64,
    pub(crate) cell_size_y: f64,
    pub(crate) channel_count: usize,
    pub(crate) polarization_count: usize,
    pub(crate) baseline_count: usize,
    pub(crate) imaging_field: u32,
}

impl<'a> GriddingParameters<'a> {
    pub(crate) fn inputs(&self) -> VisibilityInputs<'a> {
        VisibilityInputs {
            visibilities: self.visibilities,
            visibility_weights: self.visibility_weights,
            flagged_visibilities: self.flagged_visibilities,
            flagged_rows: self.flagged_rows,
            field_array: self.field_array,
            spw_index_array: self.spw_index_array,
            uvw_coords: self.uvw_coords,
            reference_wavelengths: self.reference_wavelengths,
            enabled_channels: self.enabled_channels,
            channel_grid_indices: self.channel_grid_indices,
            baseline_starting_indexes: self.baseline_starting_indexes,
            conv: self.conv,
            conv_support: self.conv_support,
            conv_oversample: self.conv_oversample,
            nx: self.nx,
            ny: self.ny,
            cell_size_x: self.cell_size_x,
            cell_size_y: self.cell_size_y,
            channel_count: self.channel_count,
            polarization_count: self.polarization_count,
            baseline_count: self.baseline_count,
            imaging_field: self.imaging_field,
        }
    }

    /// Checks everything that does not depend on which cube is the
    /// destination. Runs before the first row is touched.
    pub(crate) fn validate_common(&self) -> Result<(), ConfigurationError> {
        if self.conv_support < 1 {
            return Err(ConfigurationError::ConvolutionSupport(self.conv_support));
        }
        if self.conv_oversample < 1 {
            return Err(ConfigurationError::ConvolutionOversample(
                self.conv_oversample,
            ));
        }
        let expected_taps = ConvolutionKernel::num_taps(self.conv_support, self.conv_oversample);
        if self.conv.len() != expected_taps {
            return Err(ConfigurationError::ConvolutionFirLength {
                support: self.conv_support,
                oversample: self.conv_oversample,
                expected: expected_taps,
                got: self.conv.len(),
            });
        }

        let min_dim = 2 * self.conv_support + 4;
        if self.nx < min_dim || self.ny < min_dim {
            return Err(ConfigurationError::GridTooSmall {
                nx: self.nx,
                ny: self.ny,
                support: self.conv_support,
                min: min_dim,
            });
        }

        let expected_indexes = self.baseline_count + 1;
        if self.baseline_starting_indexes.len() != expected_indexes {
            return Err(ConfigurationError::BaselineIndexLength {
                expected: expected_indexes,
                got: self.baseline_starting_indexes.len(),
            });
        }
        if let Some(index) = self
            .baseline_starting_indexes
            .iter()
            .tuple_windows()
            .position(|(a, b)| a > b)
        {
            return Err(ConfigurationError::BaselineIndexNotMonotonic { index: index + 1 });
        }
        match self.baseline_starting_indexes.last() {
            Some(&sentinel) if sentinel != self.row_count => {
                return Err(ConfigurationError::BaselineIndexSentinel {
                    expected: self.row_count,
                    got: sentinel,
                })
            }
            _ => (),
        }

        let per_row = [
            ("uvw_coords", self.uvw_coords.len()),
            ("flagged_rows", self.flagged_rows.len()),
            ("field_array", self.field_array.len()),
            ("spw_index_array", self.spw_index_array.len()),
        ];
        for (name, got) in per_row {
            if got != self.row_count {
                return Err(ConfigurationError::ArrayLength {
                    name,
                    expected: self.row_count,
                    got,
                });
            }
        }

        let num_samples = self.row_count * self.channel_count * self.polarization_count;
        let per_sample = [
            ("visibilities", self.visibilities.len()),
            ("visibility_weights", self.visibility_weights.len()),
            ("flagged_visibilities", self.flagged_visibilities.len()),
        ];
        for (name, got) in per_sample {
            if got != num_samples {
                return Err(ConfigurationError::ArrayLength {
                    name,
                    expected: num_samples,
                    got,
                });
            }
        }

        let num_channels = self.spw_count * self.channel_count;
        let per_channel = [
            ("reference_wavelengths", self.reference_wavelengths.len()),
            ("enabled_channels", self.enabled_channels.len()),
            ("channel_grid_indices", self.channel_grid_indices.len()),
        ];
        for (name, got) in per_channel {
            if got != num_channels {
                return Err(ConfigurationError::ArrayLength {
                    name,
                    expected: num_channels,
                    got,
                });
            }
        }

        Ok(())
    }

    /// Every enabled (spw, channel) must map to a plane inside the
    /// destination cube.
    pub(crate) fn validate_channel_mapping(
        &self,
        num_grid_channels: usize,
    ) -> Result<(), ConfigurationError> {
        for (i, (&enabled, &grid_index)) in self
            .enabled_channels
            .iter()
            .zip(self.channel_grid_indices.iter())
            .enumerate()
        {
            if enabled && grid_index >= num_grid_channels {
                return Err(ConfigurationError::ChannelGridIndex {
                    spw: i / self.channel_count,
                    channel: i % self.channel_count,
                    grid_index,
                    num_grid_channels,
                });
            }
        }
        Ok(())
    }
}
