// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Facet frames and the per-facet transforms.

A facet is a sub-image centred on a chosen sky direction. Gridding a facet
requires two operations on every visibility: a rotation of its (u,v,w)
reference frame onto the facet centre, and a phase shift of the correlation
values by the direction-cosine offset of the facet from the phase centre.
Both are precomputed once per facet; the reference facet uses zero-cost
identity variants so that the no-faceting case pays for neither.
 */


use crate::c32;
use crate::constants::PI2;
use crate::coord::{DeltaLmn, RADec, UVW};
use crate::math::cexp;

/// A facet descriptor: a sky direction plus the parallactic rotation of its
/// image plane. Immutable after construction.
#[derive(Clone, Copy, Debug)]
pub struct Facet {
    /// The facet centre.
    pub centre: RADec,
    /// Rotation of the facet tangent plane about the w-axis [radians].
    pub rotation: f64,
}

impl Facet {
    pub fn new(centre: RADec, rotation: f64) -> Self {
        Self { centre, rotation }
    }

    /// A facet with an unrotated tangent plane.
    pub fn from_centre(centre: RADec) -> Self {
        Self::new(centre, 0.0)
    }

    /// Does this facet coincide with the reference frame, such that both of
    /// its transforms collapse to the identity? Exact comparison; see
    /// [`RADec::bitwise_eq`].
    pub(crate) fn is_reference(&self, reference: &Facet) -> bool {
        self.centre.bitwise_eq(&reference.centre) && self.rotation == reference.rotation
    }
}

/// Repositions a baseline's (u,v,w) into a facet's frame. Implementations
/// are selected once per facet, never per row.
pub(crate) trait UvwRotation: Sync {
    fn rotate(&self, uvw: UVW) -> UVW;
}

/// The no-faceting case: leave the baseline untouched.
pub(crate) struct NoRotation;

impl UvwRotation for NoRotation {
    #[inline(always)]
    fn rotate(&self, uvw: UVW) -> UVW {
        uvw
    }
}

/// The left-handed facet rotation,
/// `M = Z(a_new) . T(ra_new, dec_new) . T(ra_old, dec_old)^T . Z(a_old)^T`,
/// where `T(ra, dec)` is the uvw basis for a celestial reference direction
/// and `Z(a)` a rotation about the w-axis.
///
/// This is similar to the transform in Thompson, Moran & Swenson,
/// Interferometry and Synthesis in Radio Astronomy, ch. 4, but in a
/// left-handed system. We are not transforming between a coordinate system
/// with w pointing towards the pole and one with w pointing towards the
/// reference centre, so no further rotation is applied.
pub(crate) struct BaselineRotation {
    /// Row-major 3x3 transformation matrix, precomputed at construction.
    matrix: [f64; 9],
}

impl BaselineRotation {
    pub(crate) fn new(reference: &Facet, facet: &Facet) -> Self {
        let d_ra = facet.centre.ra - reference.centre.ra;
        let (s_d_ra, c_d_ra) = d_ra.sin_cos();
        let c_new_dec = facet.centre.c_dec;
        let s_new_dec = facet.centre.s_dec;
        let c_old_dec = reference.centre.c_dec;
        let s_old_dec = reference.centre.s_dec;

        // T(ra_new, dec_new) . T(ra_old, dec_old)^T, expanded symbolically.
        let tt_transpose = [
            c_d_ra,
            s_old_dec * s_d_ra,
            -c_old_dec * s_d_ra,
            -s_new_dec * s_d_ra,
            s_new_dec * s_old_dec * c_d_ra + c_new_dec * c_old_dec,
            -c_old_dec * s_new_dec * c_d_ra + c_new_dec * s_old_dec,
            c_new_dec * s_d_ra,
            -c_new_dec * s_old_dec * c_d_ra + s_new_dec * c_old_dec,
            c_new_dec * c_old_dec * c_d_ra + s_new_dec * s_old_dec,
        ];

        let (s_old_rot, c_old_rot) = reference.rotation.sin_cos();
        let z_rot_transpose = [
            c_old_rot, s_old_rot, 0.0, //
            -s_old_rot, c_old_rot, 0.0, //
            0.0, 0.0, 1.0,
        ];

        let (s_new_rot, c_new_rot) = facet.rotation.sin_cos();
        let z_rot = [
            c_new_rot, -s_new_rot, 0.0, //
            s_new_rot, c_new_rot, 0.0, //
            0.0, 0.0, 1.0,
        ];

        Self {
            matrix: mat3_mul(&z_rot, &mat3_mul(&tt_transpose, &z_rot_transpose)),
        }
    }
}

impl UvwRotation for BaselineRotation {
    #[inline]
    fn rotate(&self, uvw: UVW) -> UVW {
        // Unrolled matrix-vector product. There is a 3-way sign flip relative
        // to CASA; see "Convention for UVW calculations in CASA", Urvashi Rau
        // (2013).
        let m = &self.matrix;
        UVW {
            u: m[0] * uvw.u + m[1] * uvw.v + m[2] * uvw.w,
            v: m[3] * uvw.u + m[4] * uvw.v + m[5] * uvw.w,
            w: m[6] * uvw.u + m[7] * uvw.v + m[8] * uvw.w,
        }
    }
}

/// Row-major 3x3 matrix product.
fn mat3_mul(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut out = [0.0; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] =
                a[row * 3] * b[col] + a[row * 3 + 1] * b[3 + col] + a[row * 3 + 2] * b[6 + col];
        }
    }
    out
}

/// Produces the per-visibility phase factor for a facet. Implementations are
/// selected once per facet, never per row.
pub(crate) trait PhaseShiftPolicy: Sync {
    /// `None` means no shift is required; callers skip the multiply
    /// entirely.
    fn factor(&self, uvw: UVW) -> Option<c32>;
}

/// The no-faceting case.
pub(crate) struct NoPhaseShift;

impl PhaseShiftPolicy for NoPhaseShift {
    #[inline(always)]
    fn factor(&self, _uvw: UVW) -> Option<c32> {
        None
    }
}

/// Shift by `exp(2 pi i (u dl + v dm + w dn))`, as in Perley & Cornwell
/// (1992).
pub(crate) struct FacetPhaseShift {
    delta: DeltaLmn,
}

impl FacetPhaseShift {
    pub(crate) fn new(phase_centre: &RADec, facet_centre: &RADec) -> Self {
        Self {
            delta: DeltaLmn::from_radec_offset(phase_centre, facet_centre),
        }
    }
}

impl PhaseShiftPolicy for FacetPhaseShift {
    #[inline]
    fn factor(&self, uvw: UVW) -> Option<c32> {
        let x = *PI2 * (uvw.u * self.delta.l + uvw.v * self.delta.m + uvw.w * self.delta.n);
        let shift = cexp(x);
        Some(c32::new(shift.re as f32, shift.im as f32))
    }
}
