// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::coord::RADec;

/// The (l,m,n) direction-cosine offset of a facet centre from the phase
/// centre, as in Perley & Cornwell (1992). Dimensionless.
#[derive(Clone, Copy, Debug)]
pub struct DeltaLmn {
    /// l-offset
    pub l: f64,
    /// m-offset
    pub m: f64,
    /// n-offset, relative to the celestial sphere (n - 1 form is folded in)
    pub n: f64,
}

impl DeltaLmn {
    /// Direction-cosine offsets from the (RA, Dec) difference between a new
    /// phase centre and the old one.
    pub fn from_radec_offset(old_centre: &RADec, new_centre: &RADec) -> Self {
        let d_ra = new_centre.ra - old_centre.ra;
        let d_dec = new_centre.dec - old_centre.dec;
        let (s_d_ra, c_d_ra) = d_ra.sin_cos();
        let (s_d_dec, c_d_dec) = d_dec.sin_cos();
        Self {
            l: -c_d_dec * s_d_ra,
            m: -s_d_dec,
            n: 1.0 - c_d_dec * c_d_ra,
        }
    }
}
