// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// The (u,v,w) coordinates of a baseline. On input these are in metres; the
/// gridder divides by the reference wavelength and applies the
/// similarity-theorem scaling to express them in grid cells.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UVW {
    /// u-coordinate [metres]
    pub u: f64,
    /// v-coordinate [metres]
    pub v: f64,
    /// w-coordinate [metres]
    pub w: f64,
}

impl UVW {
    pub fn new(u: f64, v: f64, w: f64) -> Self {
        Self { u, v, w }
    }
}

impl std::ops::Div<f64> for UVW {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        UVW {
            u: self.u / rhs,
            v: self.v / rhs,
            w: self.w / rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn div_scales_all_components() {
        let uvw = UVW::new(100.0, -50.0, 2.0) / 0.5;
        assert_abs_diff_eq!(uvw.u, 200.0);
        assert_abs_diff_eq!(uvw.v, -100.0);
        assert_abs_diff_eq!(uvw.w, 4.0);
    }
}
