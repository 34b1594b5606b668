// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Combining quad-correlation grids into Stokes planes.
//!
//! When all four correlations of a linearly-polarized feed have been
//! gridded, the Stokes parameters are linear combinations of the correlation
//! planes (see Smirnov 2011, paper I, for the relation between correlation
//! products and Stokes parameters). This runs on the complex u-v planes,
//! before inversion.

use ndarray::{Array2, ArrayView3, Axis};

use crate::c32;

/// A Stokes parameter of a linearly-polarized feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StokesTerm {
    I,
    Q,
    U,
    V,
}

/// Combine a `[4][ny][nx]` block of XX, XY, YX, YY correlation planes into
/// one Stokes plane.
pub fn quad_to_stokes(quad: ArrayView3<c32>, term: StokesTerm) -> Array2<c32> {
    assert_eq!(
        quad.len_of(Axis(0)),
        4,
        "quad_to_stokes needs all four correlation planes"
    );
    let xx = quad.index_axis(Axis(0), 0);
    let xy = quad.index_axis(Axis(0), 1);
    let yx = quad.index_axis(Axis(0), 2);
    let yy = quad.index_axis(Axis(0), 3);
    match term {
        StokesTerm::I => &xx + &yy,
        StokesTerm::Q => &xx - &yy,
        StokesTerm::U => &xy + &yx,
        StokesTerm::V => (&xy - &yx) * c32::new(0.0, -1.0),
    }
}
