// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The IFFT + repack stage.

Each gridded plane is quadrant-swapped (`ifftshift`), inverse-transformed in
place, swapped back (`fftshift`), and finally repacked: the real part of
every complex sample is compacted into the first `nx * ny` floats of the
plane and the imaginary parts are discarded. The inverse transform is
unnormalized, like FFTW's backward transform.

The transforms are planned once per grid shape and shared read-only; plan
execution only touches the plane it is handed, so distinct slabs may be
processed concurrently with the same machine.
*/


use std::sync::Arc;

use log::debug;
use ndarray::Array2;
use rustfft::{Fft, FftPlanner};
use thiserror::Error;

use crate::c32;

#[derive(Error, Debug)]
pub enum FftError {
    #[error("Cannot plan a {nx}x{ny} inverse transform; both dimensions must be at least 2")]
    DegeneratePlan { nx: usize, ny: usize },

    #[error("The grid cube ({len} samples) is not a whole number of {nx}x{ny} planes")]
    BufferShape { len: usize, nx: usize, ny: usize },
}

/// Owns the inverse-FFT plans for one grid shape, scoped to a pipeline run.
pub struct IfftMachine {
    nx: usize,
    ny: usize,
    row_plan: Arc<dyn Fft<f32>>,
    col_plan: Arc<dyn Fft<f32>>,
}

impl IfftMachine {
    pub fn new(nx: usize, ny: usize) -> Result<IfftMachine, FftError> {
        if nx < 2 || ny < 2 {
            return Err(FftError::DegeneratePlan { nx, ny });
        }
        let mut planner = FftPlanner::new();
        Ok(IfftMachine {
            nx,
            ny,
            row_plan: planner.plan_fft_inverse(nx),
            col_plan: planner.plan_fft_inverse(ny),
        })
    }

    /// Invert and repack every plane of the image cube
    /// (`[facet][grid channel][pol][ny][nx]`). On return the first
    /// `nx * ny` floats of each plane are the real image; the remaining half
    /// of each plane is dead space the consumer must ignore.
    pub fn repack_and_ifft_image_cube(&self, buffer: &mut [c32]) -> Result<(), FftError> {
        debug!(
            "Inverting {} image plane(s) of {}x{}",
            buffer.len() / (self.nx * self.ny),
            self.nx,
            self.ny
        );
        self.repack_planes(buffer)
    }

    /// As [`IfftMachine::repack_and_ifft_image_cube`], for the
    /// sampling-function cube (`[facet][psf channel][ny][nx]`). All facets'
    /// planes are batched through in a single pass.
    pub fn repack_and_ifft_sampling_function_cube(
        &self,
        buffer: &mut [c32],
    ) -> Result<(), FftError> {
        debug!(
            "Inverting {} sampling-function plane(s) of {}x{}",
            buffer.len() / (self.nx * self.ny),
            self.nx,
            self.ny
        );
        self.repack_planes(buffer)
    }

    fn repack_planes(&self, buffer: &mut [c32]) -> Result<(), FftError> {
        let plane_len = self.nx * self.ny;
        if buffer.len() % plane_len != 0 {
            return Err(FftError::BufferShape {
                len: buffer.len(),
                nx: self.nx,
                ny: self.ny,
            });
        }

        let mut row_scratch = vec![c32::new(0.0, 0.0); self.row_plan.get_inplace_scratch_len()];
        let mut col_scratch = vec![c32::new(0.0, 0.0); self.col_plan.get_inplace_scratch_len()];
        let mut column = vec![c32::new(0.0, 0.0); self.ny];

        for plane in buffer.chunks_exact_mut(plane_len) {
            ifftshift(plane, self.nx, self.ny);

            // All ny rows in one call, then each column through a scratch
            // lane.
            self.row_plan.process_with_scratch(plane, &mut row_scratch);
            for x in 0..self.nx {
                for (y, value) in column.iter_mut().enumerate() {
                    *value = plane[y * self.nx + x];
                }
                self.col_plan
                    .process_with_scratch(&mut column, &mut col_scratch);
                for (y, value) in column.iter().enumerate() {
                    plane[y * self.nx + x] = *value;
                }
            }

            fftshift(plane, self.nx, self.ny);
            extract_reals(plane);
        }
        Ok(())
    }
}

/// Move the DC bin from the centre to the corner: rotate each axis left by
/// `floor(n / 2)`.
pub(crate) fn ifftshift(plane: &mut [c32], nx: usize, ny: usize) {
    // Rows are contiguous, so the row-axis swap is a single rotation of the
    // flat slice.
    plane.rotate_left((ny / 2) * nx);
    for row in plane.chunks_exact_mut(nx) {
        row.rotate_left(nx / 2);
    }
}

/// Move the DC bin from the corner to the centre: rotate each axis left by
/// `ceil(n / 2)`. Identical to [`ifftshift`] for even dimensions.
pub(crate) fn fftshift(plane: &mut [c32], nx: usize, ny: usize) {
    plane.rotate_left(((ny + 1) / 2) * nx);
    for row in plane.chunks_exact_mut(nx) {
        row.rotate_left((nx + 1) / 2);
    }
}

/// Keep the real part of every sample, compacted into the leading half of
/// the plane's floats, overwriting in place.
fn extract_reals(plane: &mut [c32]) {
    // Aliasing contract: Complex<f32> is repr(C) as [re, im], so the plane
    // is exactly 2 * plane.len() contiguous f32s. The compaction reads float
    // 2i when writing float i, and 2i >= i always, so no real part is
    // clobbered before it has been moved.
    let floats = unsafe {
        std::slice::from_raw_parts_mut(plane.as_mut_ptr().cast::<f32>(), plane.len() * 2)
    };
    for i in 0..plane.len() {
        floats[i] = floats[2 * i];
    }
}

/// Copy one repacked image plane out of a cube into a `[ny][nx]` array.
/// `plane_index` counts planes across the whole cube in storage order.
pub fn real_image_plane(
    buffer: &[c32],
    plane_index: usize,
    nx: usize,
    ny: usize,
) -> Array2<f32> {
    let plane = &buffer[plane_index * nx * ny..(plane_index + 1) * nx * ny];
    Array2::from_shape_fn((ny, nx), |(y, x)| {
        // The repacked reals straddle the complex layout: float j lives in
        // the real half of complex slot j/2 when j is even, the imaginary
        // half when odd.
        let flat = y * nx + x;
        let slot = plane[flat / 2];
        if flat % 2 == 0 {
            slot.re
        } else {
            slot.im
        }
    })
}
