// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision; the gridder does as many
calculations as possible in double precision before demoting to the grid's
single precision.
 */

pub use std::f64::consts::PI;

use lazy_static::lazy_static;

lazy_static! {
/// 2 * PI
pub static ref PI2: f64 = 2.0 * PI;

/// Speed of light [metres/second]
pub static ref VEL_C: f64 = 299_792_458.0;

/// One arcsecond in radians (PI / 180 / 3600). Cell sizes arrive in
/// arcseconds and are scaled to radians before the similarity-theorem
/// scaling.
pub static ref ARCSEC_TO_RAD: f64 = PI / 648_000.0;
}
