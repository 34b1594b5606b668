// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The gridder core: iterate rows x channels x facets and accumulate weighted
visibilities onto the complex u-v grid cubes.

Facets are independent, so they run data-parallel under rayon with one
exclusive output slab per facet worker; no scratch grids or atomics are
needed. Within a facet, rows are walked per baseline per channel with the
coalescing state machine: consecutive rows that land on the same grid cell
(and spectral window) accumulate locally and are pushed through the
convolution kernel in a single deposit when the cell changes, which is what
reproduces the published results of this gridding scheme.

All policy selection (facet transform, correlation routing, convolution
kernel) happens once per run or once per facet; the hot loop is fully
monomorphized and never dispatches per row.
*/

mod convolution;
mod correlation;
mod params;
mod stats;
#[cfg(test)]
mod tests;

pub use params::GriddingParameters;
pub use stats::GriddingStats;

use log::debug;
use rayon::prelude::*;
use vec1::Vec1;

use crate::c32;
use crate::cancel::CancellationToken;
use crate::constants::ARCSEC_TO_RAD;
use crate::coord::{RADec, UVW};
use crate::error::{ConfigurationError, FacetGridError};
use crate::facet::{
    BaselineRotation, Facet, FacetPhaseShift, NoPhaseShift, NoRotation, PhaseShiftPolicy,
    UvwRotation,
};
use convolution::{ConvolutionPolicy, NearestNeighbour, OnTheFlySinc, PrecomputedFir};
use correlation::{
    CorrelationPolicy, DualPolarization, QuadPolarization, SamplingFunction, SinglePolarization,
    VisVector,
};

/// Which correlations of each row are gridded, and into how many planes.
#[derive(Clone, Copy, Debug)]
pub enum CorrelationSelection {
    /// One chosen correlation, one grid plane.
    Single { polarization_index: usize },
    /// The two parallel hands (first and last correlation), two planes.
    Dual,
    /// All four correlations, four planes.
    Quad,
}

impl CorrelationSelection {
    /// The pol dimension of the image cube under this selection.
    pub fn num_terms(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Dual => 2,
            Self::Quad => 4,
        }
    }
}

/// Which convolution policy spreads deposits over the grid.
#[derive(Clone, Copy, Debug)]
pub enum ConvolutionSelection {
    /// The oversampled precomputed FIR (the default).
    PrecomputedFir,
    /// Evaluate a separable sinc per tap instead of reading the FIR.
    OnTheFly,
    /// Nearest-neighbour, weight 1, no sub-pixel refinement.
    NearestNeighbour,
}

/// Grid all accepted visibilities into `params.output_buffer`. The buffer
/// must be zero-initialized by the caller; on success it holds the complex
/// u-v cube `[facet][grid channel][pol][ny][nx]`, ready for
/// [`IfftMachine`](crate::IfftMachine). On error (including cancellation)
/// the buffer contents are unspecified and must be discarded.
pub fn grid_visibilities(
    params: &mut GriddingParameters,
    correlation: CorrelationSelection,
    convolution: ConvolutionSelection,
    token: &CancellationToken,
) -> Result<GriddingStats, FacetGridError> {
    params.validate_common()?;
    params.validate_channel_mapping(params.cube_channel_dim_size)?;
    match correlation {
        CorrelationSelection::Single { polarization_index }
            if polarization_index >= params.polarization_count =>
        {
            return Err(ConfigurationError::PolarizationIndex {
                index: polarization_index,
                count: params.polarization_count,
            }
            .into())
        }
        CorrelationSelection::Dual if params.polarization_count < 2 => {
            return Err(ConfigurationError::NotEnoughCorrelations {
                required: 2,
                got: params.polarization_count,
            }
            .into())
        }
        CorrelationSelection::Quad if params.polarization_count < 4 => {
            return Err(ConfigurationError::NotEnoughCorrelations {
                required: 4,
                got: params.polarization_count,
            }
            .into())
        }
        _ => (),
    }

    let facets = facet_table(params.facet_centres)?;
    let num_terms = correlation.num_terms();
    let slab_len = params.nx * params.ny * num_terms * params.cube_channel_dim_size;
    let expected = facets.len() * slab_len;
    if params.output_buffer.len() != expected {
        return Err(ConfigurationError::ArrayLength {
            name: "output_buffer",
            expected,
            got: params.output_buffer.len(),
        }
        .into());
    }

    debug!(
        "Gridding {} rows x {} channels over {} baselines into {} facet(s), {} grid channel(s), {} pol(s)",
        params.row_count,
        params.channel_count,
        params.baseline_count,
        facets.len(),
        params.cube_channel_dim_size,
        num_terms
    );

    let inputs = params.inputs();
    let phase_centre = params.phase_centre;
    let polarization_count = params.polarization_count;
    let out: &mut [c32] = &mut *params.output_buffer;
    match correlation {
        CorrelationSelection::Single { polarization_index } => dispatch_convolution(
            out,
            slab_len,
            &facets[..],
            &inputs,
            phase_centre,
            &SinglePolarization::new(polarization_index),
            convolution,
            num_terms,
            token,
        ),
        CorrelationSelection::Dual => dispatch_convolution(
            out,
            slab_len,
            &facets[..],
            &inputs,
            phase_centre,
            &DualPolarization::new(polarization_count),
            convolution,
            num_terms,
            token,
        ),
        CorrelationSelection::Quad => dispatch_convolution(
            out,
            slab_len,
            &facets[..],
            &inputs,
            phase_centre,
            &QuadPolarization,
            convolution,
            num_terms,
            token,
        ),
    }
}

/// Grid the sampling function (the PSF numerator) into
/// `params.sampling_function_buffer`: unit visibilities carrying only the
/// chosen correlation's weight and flag. The buffer must be zero-initialized
/// by the caller; the resulting cube is `[facet][psf channel][ny][nx]`.
pub fn grid_sampling_function(
    params: &mut GriddingParameters,
    polarization_index: usize,
    convolution: ConvolutionSelection,
    token: &CancellationToken,
) -> Result<GriddingStats, FacetGridError> {
    params.validate_common()?;
    params.validate_channel_mapping(params.sampling_function_channel_count)?;
    if polarization_index >= params.polarization_count {
        return Err(ConfigurationError::PolarizationIndex {
            index: polarization_index,
            count: params.polarization_count,
        }
        .into());
    }

    let facets = facet_table(params.facet_centres)?;
    let slab_len = params.nx * params.ny * params.sampling_function_channel_count;
    let expected = facets.len() * slab_len;
    if params.sampling_function_buffer.len() != expected {
        return Err(ConfigurationError::ArrayLength {
            name: "sampling_function_buffer",
            expected,
            got: params.sampling_function_buffer.len(),
        }
        .into());
    }

    debug!(
        "Gridding the sampling function for {} facet(s), {} psf channel(s)",
        facets.len(),
        params.sampling_function_channel_count
    );

    let inputs = params.inputs();
    let phase_centre = params.phase_centre;
    let out: &mut [c32] = &mut *params.sampling_function_buffer;
    dispatch_convolution(
        out,
        slab_len,
        &facets[..],
        &inputs,
        phase_centre,
        &SamplingFunction::new(polarization_index),
        convolution,
        1,
        token,
    )
}

fn facet_table(centres: &[RADec]) -> Result<Vec1<Facet>, ConfigurationError> {
    Vec1::try_from_vec(centres.iter().map(|&c| Facet::from_centre(c)).collect())
        .map_err(|_| ConfigurationError::NoFacets)
}

/// Resolve the convolution policy once, then run; the facet loop below and
/// the row loop inside it only ever see concrete policy types.
#[allow(clippy::too_many_arguments)]
fn dispatch_convolution<C: CorrelationPolicy>(
    out: &mut [c32],
    slab_len: usize,
    facets: &[Facet],
    inputs: &params::VisibilityInputs<'_>,
    phase_centre: RADec,
    correlation: &C,
    convolution: ConvolutionSelection,
    num_terms: usize,
    token: &CancellationToken,
) -> Result<GriddingStats, FacetGridError> {
    match convolution {
        ConvolutionSelection::PrecomputedFir => {
            let policy = PrecomputedFir::new(inputs, num_terms);
            run_over_facets(out, slab_len, facets, inputs, phase_centre, correlation, &policy, token)
        }
        ConvolutionSelection::OnTheFly => {
            let policy = OnTheFlySinc::new(inputs, num_terms);
            run_over_facets(out, slab_len, facets, inputs, phase_centre, correlation, &policy, token)
        }
        ConvolutionSelection::NearestNeighbour => {
            let policy = NearestNeighbour::new(inputs, num_terms);
            run_over_facets(out, slab_len, facets, inputs, phase_centre, correlation, &policy, token)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_over_facets<C: CorrelationPolicy, K: ConvolutionPolicy>(
    out: &mut [c32],
    slab_len: usize,
    facets: &[Facet],
    inputs: &params::VisibilityInputs<'_>,
    phase_centre: RADec,
    correlation: &C,
    convolution: &K,
    token: &CancellationToken,
) -> Result<GriddingStats, FacetGridError> {
    let reference = Facet::from_centre(phase_centre);
    let per_facet = out
        .par_chunks_exact_mut(slab_len)
        .zip(facets.par_iter())
        .map(|(slab, facet)| {
            if token.is_cancelled() {
                return Err(FacetGridError::Cancelled);
            }
            if facet.is_reference(&reference) {
                // The no-transform specializations: nothing facet-related
                // survives into this instantiation of the hot loop.
                grid_one_facet(slab, inputs, &NoRotation, &NoPhaseShift, correlation, convolution, token)
            } else {
                let rotation = BaselineRotation::new(&reference, facet);
                let phase = FacetPhaseShift::new(&reference.centre, &facet.centre);
                grid_one_facet(slab, inputs, &rotation, &phase, correlation, convolution, token)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(per_facet
        .into_iter()
        .fold(GriddingStats::default(), |acc, s| acc + s))
}

/// The pending deposit of a coalescing run: where the run started, in both
/// continuous grid coordinates (for the convolution) and the cell the
/// active convolution policy would deposit at (for change detection).
#[derive(Clone, Copy)]
struct FlushPoint {
    uvw: UVW,
    cell_u: i64,
    cell_v: i64,
    spw: usize,
    grid_channel: usize,
}

/// The hot loop for one facet slab. Single-threaded; facet-level parallelism
/// happens in the caller.
fn grid_one_facet<R, P, C, K>(
    slab: &mut [c32],
    inputs: &params::VisibilityInputs<'_>,
    rotation: &R,
    phase: &P,
    correlation: &C,
    convolution: &K,
    token: &CancellationToken,
) -> Result<GriddingStats, FacetGridError>
where
    R: UvwRotation,
    P: PhaseShiftPolicy,
    C: CorrelationPolicy,
    K: ConvolutionPolicy,
{
    let mut stats = GriddingStats::default();

    // Scale the IFFT to the correct field of view by the similarity theorem
    // (pg 146-148, Synthesis Imaging in Radio Astronomy II).
    let u_scale = inputs.nx as f64 * inputs.cell_size_x * *ARCSEC_TO_RAD;
    let v_scale = -(inputs.ny as f64 * inputs.cell_size_y * *ARCSEC_TO_RAD);
    let row_stride = inputs.channel_count * inputs.polarization_count;

    for baseline in 0..inputs.baseline_count {
        if token.is_cancelled() {
            return Err(FacetGridError::Cancelled);
        }
        let start = inputs.baseline_starting_indexes[baseline];
        let end = inputs.baseline_starting_indexes[baseline + 1];

        // Accumulators are kept per channel: channels land on different grid
        // cells, so each (baseline, channel) pair walks its own run.
        for channel in 0..inputs.channel_count {
            let mut accum = <C::Vis as VisVector>::zero();
            let mut pending: Option<FlushPoint> = None;

            for row in start..end {
                if inputs.flagged_rows[row] {
                    stats.samples_skipped_row_flag += 1;
                    continue;
                }
                if inputs.field_array[row] != inputs.imaging_field {
                    stats.samples_skipped_field += 1;
                    continue;
                }
                let spw = inputs.spw_index_array[row];
                let spw_chan = spw * inputs.channel_count + channel;
                if !inputs.enabled_channels[spw_chan] {
                    stats.samples_skipped_disabled_channel += 1;
                    continue;
                }
                let grid_channel = inputs.channel_grid_indices[spw_chan];

                let mut uvw = inputs.uvw_coords[row] / inputs.reference_wavelengths[spw_chan];
                uvw.u *= u_scale;
                uvw.v *= v_scale;
                let uvw = rotation.rotate(uvw);

                let (mut vis, flagged) = correlation.read(
                    inputs.visibilities,
                    inputs.visibility_weights,
                    inputs.flagged_visibilities,
                    row * row_stride + channel * inputs.polarization_count,
                );
                stats.correlations_flagged += flagged;
                if let Some(factor) = phase.factor(uvw) {
                    vis.rotate_phase(factor);
                }

                // The change detection and the eventual deposit must agree
                // on the cell, so the policy owns the discretization.
                let (cell_u, cell_v) = convolution.deposit_cell(uvw);
                match pending {
                    None => {
                        pending = Some(FlushPoint {
                            uvw,
                            cell_u,
                            cell_v,
                            spw,
                            grid_channel,
                        });
                    }
                    Some(point)
                        if point.cell_u != cell_u
                            || point.cell_v != cell_v
                            || point.spw != spw =>
                    {
                        flush(slab, correlation, convolution, point, accum, &mut stats);
                        accum = <C::Vis as VisVector>::zero();
                        pending = Some(FlushPoint {
                            uvw,
                            cell_u,
                            cell_v,
                            spw,
                            grid_channel,
                        });
                    }
                    Some(_) => (),
                }
                accum.accumulate(vis);
                stats.samples_accumulated += 1;
            }

            // The last run of the baseline flushes unconditionally.
            if let Some(point) = pending {
                flush(slab, correlation, convolution, point, accum, &mut stats);
            }
        }
    }
    Ok(stats)
}

fn flush<C: CorrelationPolicy, K: ConvolutionPolicy>(
    slab: &mut [c32],
    correlation: &C,
    convolution: &K,
    point: FlushPoint,
    accum: C::Vis,
    stats: &mut GriddingStats,
) {
    match convolution.convolve(slab, correlation, point.grid_channel, point.uvw, accum) {
        Some(_) => stats.deposits += 1,
        None => stats.edge_drops += 1,
    }
}
