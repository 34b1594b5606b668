// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convolution policies: how a (coalesced) visibility is spread over grid
//! cells.
//!
//! All three policies share the edge-drop rule: if any tap of the stencil
//! would land on or past the grid boundary the whole deposit is dropped and
//! `None` is returned, before anything is written. Grid planes are row-major
//! `[ny][nx]`.

use super::correlation::CorrelationPolicy;
use super::params::VisibilityInputs;
use crate::c32;
use crate::coord::UVW;
use crate::math::sinc;

/// Spreads one deposit over the stencil of the active kernel.
pub(crate) trait ConvolutionPolicy: Sync {
    /// The grid cell a deposit at `uvw` would be centred on, under this
    /// policy's own translation. The coalescing state machine keys its
    /// change detection on this value, so it can never disagree with where
    /// `convolve` actually writes.
    fn deposit_cell(&self, uvw: UVW) -> (i64, i64);

    /// Deposit `vis` at `uvw` (grid coordinates) into channel plane
    /// `grid_channel` of the facet slab, returning the total tap weight, or
    /// `None` if the edge policy dropped it.
    fn convolve<C: CorrelationPolicy>(
        &self,
        slab: &mut [c32],
        correlation: &C,
        grid_channel: usize,
        uvw: UVW,
        vis: C::Vis,
    ) -> Option<f32>;
}

/// Round a translated grid coordinate and apply the edge policy. Returns the
/// integer cell and the fractional offset `cell - translated`.
#[inline(always)]
fn discretise(translated: f64, dim: usize, full_support: usize) -> Option<(usize, f64)> {
    let cell = translated.round();
    if cell < 0.0 {
        return None;
    }
    let disc = cell as usize;
    if disc + full_support >= dim || disc >= dim {
        return None;
    }
    Some((disc, cell - translated))
}

/// Round a pair of translated coordinates without the edge policy; the
/// state machine tracks off-grid runs too (their flushes become edge
/// drops).
#[inline(always)]
fn rounded_cell((translated_u, translated_v): (f64, f64)) -> (i64, i64) {
    (translated_u.round() as i64, translated_v.round() as i64)
}

/// The default policy: an oversampled, precomputed FIR with fractional-pixel
/// interpolation. The kernel is translated so that rounding the visibility
/// also selects the closest of the `oversample` tabulated fractional phases.
pub(crate) struct PrecomputedFir<'a> {
    nx: usize,
    ny: usize,
    grid_u_centre: f64,
    grid_v_centre: f64,
    full_support: usize,
    oversample: usize,
    conv: &'a [f32],
    /// Half the padded stencil, `(2S + 3) / 2`.
    centre_offset: f64,
    plane_stride: usize,
    chan_dim_step: usize,
}

impl<'a> PrecomputedFir<'a> {
    pub(crate) fn new(inputs: &VisibilityInputs<'a>, num_polarizations: usize) -> Self {
        let full_support = 2 * inputs.conv_support + 1;
        Self {
            nx: inputs.nx,
            ny: inputs.ny,
            grid_u_centre: (inputs.nx / 2) as f64,
            grid_v_centre: (inputs.ny / 2) as f64,
            full_support,
            oversample: inputs.conv_oversample,
            conv: inputs.conv,
            centre_offset: (full_support + 2) as f64 / 2.0,
            plane_stride: inputs.nx * inputs.ny,
            chan_dim_step: inputs.nx * inputs.ny * num_polarizations,
        }
    }

    #[inline(always)]
    fn translate(&self, uvw: UVW) -> (f64, f64) {
        (
            uvw.u + self.grid_u_centre - self.centre_offset,
            uvw.v + self.grid_v_centre - self.centre_offset,
        )
    }

    /// The oversampled phase index of the closest tabulated fraction; the
    /// +/- half-cell offset lands inside the one-cell headroom at either
    /// end of the FIR.
    #[inline(always)]
    fn fir_base(&self, frac: f64) -> usize {
        ((frac + 1.0) * self.oversample as f64) as usize
    }

    /// The FIR phases `convolve` will read for this sample, or `None` if
    /// the edge policy drops it. The mass-conservation property is asserted
    /// against these.
    pub(crate) fn fir_phases(&self, uvw: UVW) -> Option<(usize, usize)> {
        let (translated_u, translated_v) = self.translate(uvw);
        let (_, frac_u) = discretise(translated_u, self.nx, self.full_support)?;
        let (_, frac_v) = discretise(translated_v, self.ny, self.full_support)?;
        Some((self.fir_base(frac_u), self.fir_base(frac_v)))
    }
}

impl<'a> ConvolutionPolicy for PrecomputedFir<'a> {
    #[inline]
    fn deposit_cell(&self, uvw: UVW) -> (i64, i64) {
        rounded_cell(self.translate(uvw))
    }

    #[inline]
    fn convolve<C: CorrelationPolicy>(
        &self,
        slab: &mut [c32],
        correlation: &C,
        grid_channel: usize,
        uvw: UVW,
        vis: C::Vis,
    ) -> Option<f32> {
        let (translated_u, translated_v) = self.translate(uvw);
        let (disc_u, frac_u) = discretise(translated_u, self.nx, self.full_support)?;
        let (disc_v, frac_v) = discretise(translated_v, self.ny, self.full_support)?;
        let base_u = self.fir_base(frac_u);
        let base_v = self.fir_base(frac_v);

        let chan_slab = &mut slab
            [grid_channel * self.chan_dim_step..(grid_channel + 1) * self.chan_dim_step];
        let mut accum = 0.0_f32;
        for tap_v in 1..=self.full_support {
            let weight_v = self.conv[base_v + tap_v * self.oversample];
            let row = (disc_v + tap_v) * self.nx + disc_u;
            for tap_u in 1..=self.full_support {
                let weight = self.conv[base_u + tap_u * self.oversample] * weight_v;
                correlation.deposit(chan_slab, self.plane_stride, row + tap_u, vis, weight);
                accum += weight;
            }
        }
        Some(accum)
    }
}

/// Nearest-neighbour gridding: the whole deposit lands on one cell with
/// weight 1. No sub-pixel refinement.
pub(crate) struct NearestNeighbour {
    nx: usize,
    ny: usize,
    grid_u_centre: f64,
    grid_v_centre: f64,
    full_support: usize,
    plane_stride: usize,
    chan_dim_step: usize,
}

impl NearestNeighbour {
    pub(crate) fn new(inputs: &VisibilityInputs<'_>, num_polarizations: usize) -> Self {
        Self {
            nx: inputs.nx,
            ny: inputs.ny,
            grid_u_centre: (inputs.nx / 2) as f64,
            grid_v_centre: (inputs.ny / 2) as f64,
            full_support: 2 * inputs.conv_support + 1,
            plane_stride: inputs.nx * inputs.ny,
            chan_dim_step: inputs.nx * inputs.ny * num_polarizations,
        }
    }

    #[inline(always)]
    fn translate(&self, uvw: UVW) -> (f64, f64) {
        (uvw.u + self.grid_u_centre, uvw.v + self.grid_v_centre)
    }
}

impl ConvolutionPolicy for NearestNeighbour {
    #[inline]
    fn deposit_cell(&self, uvw: UVW) -> (i64, i64) {
        rounded_cell(self.translate(uvw))
    }

    #[inline]
    fn convolve<C: CorrelationPolicy>(
        &self,
        slab: &mut [c32],
        correlation: &C,
        grid_channel: usize,
        uvw: UVW,
        vis: C::Vis,
    ) -> Option<f32> {
        let (translated_u, translated_v) = self.translate(uvw);
        let (disc_u, _) = discretise(translated_u, self.nx, self.full_support)?;
        let (disc_v, _) = discretise(translated_v, self.ny, self.full_support)?;

        let chan_slab = &mut slab
            [grid_channel * self.chan_dim_step..(grid_channel + 1) * self.chan_dim_step];
        correlation.deposit(
            chan_slab,
            self.plane_stride,
            disc_v * self.nx + disc_u,
            vis,
            1.0,
        );
        Some(1.0)
    }
}

/// Debugging policy that evaluates a separable sinc window on the fly
/// instead of reading a tabulated FIR.
pub(crate) struct OnTheFlySinc {
    nx: usize,
    ny: usize,
    grid_u_centre: f64,
    grid_v_centre: f64,
    support: usize,
    full_support: usize,
    plane_stride: usize,
    chan_dim_step: usize,
}

impl OnTheFlySinc {
    pub(crate) fn new(inputs: &VisibilityInputs<'_>, num_polarizations: usize) -> Self {
        Self {
            nx: inputs.nx,
            ny: inputs.ny,
            grid_u_centre: (inputs.nx / 2) as f64,
            grid_v_centre: (inputs.ny / 2) as f64,
            support: inputs.conv_support,
            full_support: 2 * inputs.conv_support + 1,
            plane_stride: inputs.nx * inputs.ny,
            chan_dim_step: inputs.nx * inputs.ny * num_polarizations,
        }
    }

    #[inline(always)]
    fn translate(&self, uvw: UVW) -> (f64, f64) {
        let support = self.support as f64;
        (
            uvw.u + self.grid_u_centre - support,
            uvw.v + self.grid_v_centre - support,
        )
    }
}

impl ConvolutionPolicy for OnTheFlySinc {
    #[inline]
    fn deposit_cell(&self, uvw: UVW) -> (i64, i64) {
        rounded_cell(self.translate(uvw))
    }

    #[inline]
    fn convolve<C: CorrelationPolicy>(
        &self,
        slab: &mut [c32],
        correlation: &C,
        grid_channel: usize,
        uvw: UVW,
        vis: C::Vis,
    ) -> Option<f32> {
        let support = self.support as f64;
        let (translated_u, translated_v) = self.translate(uvw);
        let (disc_u, frac_u) = discretise(translated_u, self.nx, self.full_support)?;
        let (disc_v, frac_v) = discretise(translated_v, self.ny, self.full_support)?;

        let chan_slab = &mut slab
            [grid_channel * self.chan_dim_step..(grid_channel + 1) * self.chan_dim_step];
        let mut accum = 0.0_f32;
        for tap_v in 0..self.full_support {
            let weight_v = sinc(tap_v as f64 - support + frac_v) as f32;
            let row = (disc_v + tap_v) * self.nx + disc_u;
            for tap_u in 0..self.full_support {
                let weight = sinc(tap_u as f64 - support + frac_u) as f32 * weight_v;
                correlation.deposit(chan_slab, self.plane_stride, row + tap_u, vis, weight);
                accum += weight;
            }
        }
        Some(accum)
    }
}
