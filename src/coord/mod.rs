// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Coordinate value types used by the gridder.

These coordinate systems are discussed at length in Interferometry and
Synthesis in Radio Astronomy, Third Edition, Section 4: Geometrical
Relationships, Polarimetry, and the Measurement Equation.
 */

mod lmn;
mod radec;
mod uvw;

pub use lmn::DeltaLmn;
pub use radec::RADec;
pub use uvw::UVW;
