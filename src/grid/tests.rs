// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::error::ConfigurationError;
use crate::kernel::ConvolutionKernel;

/// One arcsecond cell sizes are awkward in tests; this cell size makes the
/// similarity-theorem scale exactly 1, so a uvw in "metres" at wavelength 1
/// is already in grid cells (v negated).
fn unit_cell(n: usize) -> f64 {
    1.0 / (n as f64 * *ARCSEC_TO_RAD)
}

/// Owns every array a [`GriddingParameters`] borrows. Defaults to one
/// baseline of unit visibilities at (u,v,w) = 0 on a 64x64 grid with the
/// top-hat FIR (S=3, O=63), one channel, one correlation, one facet at the
/// phase centre.
struct TestData {
    nx: usize,
    ny: usize,
    support: usize,
    oversample: usize,
    kernel: ConvolutionKernel,
    visibilities: Vec<c32>,
    weights: Vec<f32>,
    vis_flags: Vec<bool>,
    row_flags: Vec<bool>,
    fields: Vec<u32>,
    spws: Vec<usize>,
    uvws: Vec<UVW>,
    wavelengths: Vec<f64>,
    enabled: Vec<bool>,
    grid_indices: Vec<usize>,
    baseline_starts: Vec<usize>,
    facets: Vec<RADec>,
    output: Vec<c32>,
    psf: Vec<c32>,
    spw_count: usize,
    channel_count: usize,
    pol_count: usize,
    cube_channels: usize,
    psf_channels: usize,
    phase_centre: RADec,
    imaging_field: u32,
}

impl TestData {
    fn new(rows: usize, channels: usize, pols: usize) -> TestData {
        let nx = 64;
        let ny = 64;
        let support = 3;
        let oversample = 63;
        let phase_centre = RADec::new_degrees(45.0, -26.7);
        TestData {
            nx,
            ny,
            support,
            oversample,
            kernel: ConvolutionKernel::top_hat(support, oversample).unwrap(),
            visibilities: vec![c32::new(1.0, 0.0); rows * channels * pols],
            weights: vec![1.0; rows * channels * pols],
            vis_flags: vec![false; rows * channels * pols],
            row_flags: vec![false; rows],
            fields: vec![0; rows],
            spws: vec![0; rows],
            uvws: vec![UVW::default(); rows],
            wavelengths: vec![1.0; channels],
            enabled: vec![true; channels],
            grid_indices: vec![0; channels],
            baseline_starts: vec![0, rows],
            facets: vec![phase_centre],
            output: vec![c32::new(0.0, 0.0); nx * ny],
            psf: vec![c32::new(0.0, 0.0); nx * ny],
            spw_count: 1,
            channel_count: channels,
            pol_count: pols,
            cube_channels: 1,
            psf_channels: 1,
            phase_centre,
            imaging_field: 0,
        }
    }

    /// Resize the output cubes after changing facets, planes or pols.
    fn resize_buffers(&mut self, num_terms: usize) {
        let plane = self.nx * self.ny;
        self.output =
            vec![c32::new(0.0, 0.0); self.facets.len() * self.cube_channels * num_terms * plane];
        self.psf = vec![c32::new(0.0, 0.0); self.facets.len() * self.psf_channels * plane];
    }

    fn params(&mut self) -> GriddingParameters<'_> {
        GriddingParameters {
            visibilities: &self.visibilities,
            visibility_weights: &self.weights,
            flagged_visibilities: &self.vis_flags,
            flagged_rows: &self.row_flags,
            field_array: &self.fields,
            spw_index_array: &self.spws,
            uvw_coords: &self.uvws,
            reference_wavelengths: &self.wavelengths,
            enabled_channels: &self.enabled,
            channel_grid_indices: &self.grid_indices,
            baseline_starting_indexes: &self.baseline_starts,
            facet_centres: &self.facets,
            conv: self.kernel.taps(),
            output_buffer: &mut self.output,
            sampling_function_buffer: &mut self.psf,
            nx: self.nx,
            ny: self.ny,
            cell_size_x: unit_cell(self.nx),
            cell_size_y: unit_cell(self.ny),
            conv_support: self.support,
            conv_oversample: self.oversample,
            spw_count: self.spw_count,
            channel_count: self.channel_count,
            polarization_count: self.pol_count,
            baseline_count: self.baseline_starts.len() - 1,
            row_count: self.uvws.len(),
            cube_channel_dim_size: self.cube_channels,
            sampling_function_channel_count: self.psf_channels,
            phase_centre: self.phase_centre,
            imaging_field: self.imaging_field,
        }
    }

    fn grid_single(&mut self) -> GriddingStats {
        grid_visibilities(
            &mut self.params(),
            CorrelationSelection::Single {
                polarization_index: 0,
            },
            ConvolutionSelection::PrecomputedFir,
            &CancellationToken::new(),
        )
        .unwrap()
    }

    fn output_sum(&self) -> c32 {
        self.output
            .iter()
            .fold(c32::new(0.0, 0.0), |acc, z| acc + z)
    }
}

#[test]
fn single_pixel_source_deposits_the_kernel_footprint() {
    let mut data = TestData::new(1, 1, 1);
    let stats = data.grid_single();

    assert_eq!(stats.samples_accumulated, 1);
    assert_eq!(stats.deposits, 1);
    assert_eq!(stats.edge_drops, 0);

    // A top-hat FIR deposits (2S+1)^2 unit weights.
    let nonzero = data.output.iter().filter(|z| z.norm() > 0.0).count();
    assert_eq!(nonzero, 49);
    let sum = data.output_sum();
    assert_abs_diff_eq!(sum.re, 49.0, epsilon = 1e-4);
    assert_abs_diff_eq!(sum.im, 0.0);
}

#[test]
fn mass_conservation_for_a_fractional_sample() {
    let mut data = TestData::new(1, 1, 1);
    data.support = 2;
    data.oversample = 16;
    data.kernel = ConvolutionKernel::sinc(2, 16).unwrap();
    data.uvws[0] = UVW::new(0.3, -0.7, 0.0);
    let stats = data.grid_single();
    assert_eq!(stats.deposits, 1);
    let observed = data.output_sum().re;

    // Ask the production policy which oversampled phases it read for this
    // sample (v is negated by the similarity scaling), then compare the
    // deposited weight against the FIR's stride-O mass at those phases.
    let (base_u, base_v) = {
        let params = data.params();
        let inputs = params.inputs();
        let policy = PrecomputedFir::new(&inputs, 1);
        policy.fir_phases(UVW::new(0.3, 0.7, 0.0)).unwrap()
    };
    let expected = data.kernel.total_mass(base_u) * data.kernel.total_mass(base_v);
    assert_abs_diff_eq!(observed, expected, epsilon = 1e-4);
}

#[test]
fn fractional_rows_straddling_a_cell_boundary_flush_separately() {
    // Two rows whose rounded positions agree under an offset-free rounding
    // but whose deposit cells differ under the FIR's half-integer centring;
    // each must get its own deposit at its own cell.
    let mut data = TestData::new(2, 1, 1);
    data.uvws[0] = UVW::new(3.9, 0.0, 0.0);
    data.uvws[1] = UVW::new(4.4, 0.0, 0.0);
    let stats = data.grid_single();

    assert_eq!(stats.samples_accumulated, 2);
    assert_eq!(stats.deposits, 2);
    assert_abs_diff_eq!(data.output_sum().re, 2.0 * 49.0, epsilon = 1e-3);

    // The top-hat stencils are one column apart: u = 3.9 discretises to
    // cell 31 (columns 32..=38), u = 4.4 to cell 32 (columns 33..=39).
    let column_sum = |x: usize| -> f32 {
        (0..data.ny).map(|y| data.output[y * data.nx + x].re).sum()
    };
    assert_abs_diff_eq!(column_sum(31), 0.0);
    assert_abs_diff_eq!(column_sum(32), 7.0, epsilon = 1e-4);
    for x in 33..=38 {
        assert_abs_diff_eq!(column_sum(x), 14.0, epsilon = 1e-4);
    }
    assert_abs_diff_eq!(column_sum(39), 7.0, epsilon = 1e-4);
    assert_abs_diff_eq!(column_sum(40), 0.0);
}

#[test]
fn edge_drop_increments_the_counter_and_writes_nothing() {
    let mut data = TestData::new(1, 1, 1);
    // Map the sample to column nx - 2; the stencil cannot fit.
    data.uvws[0] = UVW::new((data.nx - 2) as f64 - (data.nx / 2) as f64, 0.0, 0.0);
    let stats = data.grid_single();

    assert_eq!(stats.deposits, 0);
    assert_eq!(stats.edge_drops, 1);
    assert!(data.output.iter().all(|z| z.norm() == 0.0));
}

#[test]
fn negative_cells_are_dropped_too() {
    let mut data = TestData::new(1, 1, 1);
    data.uvws[0] = UVW::new(-((data.nx / 2) as f64) - 1.0, 0.0, 0.0);
    let stats = data.grid_single();
    assert_eq!(stats.edge_drops, 1);
    assert!(data.output.iter().all(|z| z.norm() == 0.0));
}

#[test]
fn flagged_rows_suppress_everything() {
    let mut data = TestData::new(1, 1, 1);
    data.row_flags[0] = true;
    let stats = data.grid_single();

    assert_eq!(stats.samples_skipped_row_flag, 1);
    assert_eq!(stats.samples_accumulated, 0);
    assert_eq!(stats.deposits, 0);
    assert!(data.output.iter().all(|z| z.norm() == 0.0));
}

#[test]
fn rows_of_other_fields_are_skipped() {
    let mut data = TestData::new(2, 1, 1);
    data.fields[1] = 3;
    let stats = data.grid_single();
    assert_eq!(stats.samples_skipped_field, 1);
    assert_eq!(stats.samples_accumulated, 1);
}

#[test]
fn disabled_channels_never_reach_the_grid() {
    let mut data = TestData::new(1, 2, 1);
    data.enabled[1] = false;
    let stats = data.grid_single();

    assert_eq!(stats.samples_skipped_disabled_channel, 1);
    assert_eq!(stats.samples_accumulated, 1);
    // Only channel 0's footprint is present.
    assert_abs_diff_eq!(data.output_sum().re, 49.0, epsilon = 1e-4);
}

#[test]
fn per_correlation_flags_zero_their_weight_only() {
    let mut data = TestData::new(1, 1, 2);
    data.vis_flags[1] = true;
    data.resize_buffers(2);
    let stats = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Dual,
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(stats.correlations_flagged, 1);
    let plane = data.nx * data.ny;
    let first: f32 = data.output[..plane].iter().map(|z| z.re).sum();
    let second: f32 = data.output[plane..].iter().map(|z| z.re).sum();
    assert_abs_diff_eq!(first, 49.0, epsilon = 1e-4);
    assert_abs_diff_eq!(second, 0.0);
}

#[test]
fn channel_averaging_sums_into_one_plane() {
    let mut data = TestData::new(1, 2, 1);
    // Both channels map to grid plane 0.
    assert_eq!(data.grid_indices, vec![0, 0]);
    let stats = data.grid_single();
    assert_eq!(stats.deposits, 2);
    assert_abs_diff_eq!(data.output_sum().re, 2.0 * 49.0, epsilon = 1e-3);
}

#[test]
fn gridding_is_linear_in_the_visibilities() {
    let mut a = TestData::new(1, 1, 1);
    a.uvws[0] = UVW::new(1.25, -3.5, 0.0);
    a.kernel = ConvolutionKernel::sinc(3, 63).unwrap();
    a.grid_single();

    let mut b = TestData::new(1, 1, 1);
    b.uvws[0] = a.uvws[0];
    b.kernel = ConvolutionKernel::sinc(3, 63).unwrap();
    b.visibilities[0] = c32::new(2.5, 0.0);
    b.grid_single();

    for (za, zb) in a.output.iter().zip(b.output.iter()) {
        assert_abs_diff_eq!(za.re * 2.5, zb.re, epsilon = 1e-5);
        assert_abs_diff_eq!(za.im * 2.5, zb.im, epsilon = 1e-5);
    }
}

#[test]
fn coalescing_makes_one_deposit_per_unique_cell() {
    let mut data = TestData::new(3, 1, 1);
    // Three rows of one baseline at the same (u,v): one deposit.
    let stats = data.grid_single();
    assert_eq!(stats.samples_accumulated, 3);
    assert_eq!(stats.deposits, 1);
    assert_abs_diff_eq!(data.output_sum().re, 3.0 * 49.0, epsilon = 1e-3);
}

#[test]
fn a_cell_change_flushes_the_run() {
    let mut data = TestData::new(3, 1, 1);
    data.uvws[2] = UVW::new(5.0, 0.0, 0.0);
    let stats = data.grid_single();
    assert_eq!(stats.deposits, 2);
    assert_abs_diff_eq!(data.output_sum().re, 3.0 * 49.0, epsilon = 1e-3);
}

#[test]
fn a_spw_change_flushes_the_run() {
    let mut data = TestData::new(2, 1, 1);
    data.spw_count = 2;
    data.spws[1] = 1;
    data.wavelengths = vec![1.0, 1.0];
    data.enabled = vec![true, true];
    data.grid_indices = vec![0, 0];
    let stats = data.grid_single();
    assert_eq!(stats.deposits, 2);
}

#[test]
fn quad_correlations_land_in_their_own_planes() {
    let mut data = TestData::new(1, 1, 4);
    data.visibilities = vec![
        c32::new(1.0, 0.0),
        c32::new(0.0, 2.0),
        c32::new(3.0, 0.0),
        c32::new(0.0, -4.0),
    ];
    data.resize_buffers(4);
    grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Quad,
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    )
    .unwrap();

    let plane = data.nx * data.ny;
    let sums: Vec<c32> = (0..4)
        .map(|p| {
            data.output[p * plane..(p + 1) * plane]
                .iter()
                .fold(c32::new(0.0, 0.0), |acc, z| acc + z)
        })
        .collect();
    assert_abs_diff_eq!(sums[0].re, 49.0, epsilon = 1e-3);
    assert_abs_diff_eq!(sums[1].im, 2.0 * 49.0, epsilon = 1e-3);
    assert_abs_diff_eq!(sums[2].re, 3.0 * 49.0, epsilon = 1e-3);
    assert_abs_diff_eq!(sums[3].im, -4.0 * 49.0, epsilon = 1e-3);
}

#[test]
fn nearest_neighbour_deposits_once_with_unit_weight() {
    let mut data = TestData::new(1, 1, 1);
    let stats = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::NearestNeighbour,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(stats.deposits, 1);

    let centre = (data.ny / 2) * data.nx + data.nx / 2;
    assert_abs_diff_eq!(data.output[centre].re, 1.0);
    let nonzero = data.output.iter().filter(|z| z.norm() > 0.0).count();
    assert_eq!(nonzero, 1);
}

#[test]
fn on_the_fly_sinc_at_an_integer_cell_is_a_delta() {
    let mut data = TestData::new(1, 1, 1);
    grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::OnTheFly,
        &CancellationToken::new(),
    )
    .unwrap();

    // With zero fractional offset the separable sinc hits its zeros at every
    // tap but the centre.
    let centre = (data.ny / 2) * data.nx + data.nx / 2;
    assert_abs_diff_eq!(data.output[centre].re, 1.0, epsilon = 1e-5);
    let off_centre: f32 = data
        .output
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != centre)
        .map(|(_, z)| z.norm())
        .sum();
    assert_abs_diff_eq!(off_centre, 0.0, epsilon = 1e-4);
}

#[test]
fn phase_centre_facet_is_identical_with_and_without_a_companion() {
    let mut alone = TestData::new(2, 1, 1);
    alone.uvws = vec![UVW::new(3.2, -1.5, 0.4), UVW::new(-7.8, 2.25, -0.1)];
    alone.kernel = ConvolutionKernel::sinc(3, 63).unwrap();
    alone.grid_single();

    let mut paired = TestData::new(2, 1, 1);
    paired.uvws = alone.uvws.clone();
    paired.kernel = ConvolutionKernel::sinc(3, 63).unwrap();
    paired.facets = vec![
        paired.phase_centre,
        RADec::new_degrees(45.25, -26.5),
    ];
    paired.resize_buffers(1);
    paired.grid_single();

    // The phase-centre facet must be bit-identical between the runs.
    let slab = alone.output.len();
    assert_eq!(&paired.output[..slab], &alone.output[..]);
    // And the offset facet must actually differ.
    assert_ne!(&paired.output[slab..], &alone.output[..]);
}

#[test]
fn sampling_function_integral_counts_accepted_samples() {
    let mut data = TestData::new(3, 2, 1);
    data.row_flags[2] = true;
    let stats = grid_sampling_function(
        &mut data.params(),
        0,
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    )
    .unwrap();

    // 2 unflagged rows x 2 channels accepted.
    assert_eq!(stats.samples_accumulated, 4);
    let sum = data
        .psf
        .iter()
        .fold(c32::new(0.0, 0.0), |acc, z| acc + z);
    assert_abs_diff_eq!(sum.re, 4.0 * 49.0, epsilon = 1e-3);
    assert_abs_diff_eq!(sum.im, 0.0);
}

#[test]
fn cancellation_aborts_before_gridding() {
    let mut data = TestData::new(1, 1, 1);
    let token = CancellationToken::new();
    token.cancel();
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &token,
    );
    assert!(matches!(result, Err(FacetGridError::Cancelled)));
}

#[test]
fn configuration_errors_surface_before_gridding() {
    // Zero support.
    let mut data = TestData::new(1, 1, 1);
    data.support = 0;
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(
            ConfigurationError::ConvolutionSupport(0)
        ))
    ));

    // Broken sentinel.
    let mut data = TestData::new(2, 1, 1);
    data.baseline_starts = vec![0, 1];
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(
            ConfigurationError::BaselineIndexSentinel { .. }
        ))
    ));

    // Non-monotonic baseline prefix sum.
    let mut data = TestData::new(2, 1, 1);
    data.baseline_starts = vec![0, 2, 1, 2];
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(
            ConfigurationError::BaselineIndexNotMonotonic { .. }
        ))
    ));

    // Empty facet table.
    let mut data = TestData::new(1, 1, 1);
    data.facets = vec![];
    data.output.clear();
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(ConfigurationError::NoFacets))
    ));

    // An enabled channel pointing outside the cube.
    let mut data = TestData::new(1, 1, 1);
    data.grid_indices = vec![1];
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Single {
            polarization_index: 0,
        },
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(
            ConfigurationError::ChannelGridIndex { .. }
        ))
    ));

    // Quad gridding needs 4 correlations in the data.
    let mut data = TestData::new(1, 1, 2);
    data.resize_buffers(4);
    let result = grid_visibilities(
        &mut data.params(),
        CorrelationSelection::Quad,
        ConvolutionSelection::PrecomputedFir,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(FacetGridError::Configuration(
            ConfigurationError::NotEnoughCorrelations { required: 4, .. }
        ))
    ));
}

#[test]
fn weights_scale_the_deposit() {
    let mut data = TestData::new(1, 1, 1);
    data.weights[0] = 0.25;
    data.grid_single();
    assert_abs_diff_eq!(data.output_sum().re, 0.25 * 49.0, epsilon = 1e-4);
}
