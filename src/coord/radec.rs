// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// A struct containing a Right Ascension and Declination. As the sine and
/// cosine of these coordinates is often used, these are also stored in the
/// struct. All units are in radians.
#[derive(Clone, Copy, Debug)]
pub struct RADec {
    /// Right ascension [radians]
    pub ra: f64,
    /// sin(ra)
    pub s_ra: f64,
    /// cos(ra)
    pub c_ra: f64,
    /// Declination [radians]
    pub dec: f64,
    /// sin(dec)
    pub s_dec: f64,
    /// cos(dec)
    pub c_dec: f64,
}

impl RADec {
    /// As the struct caches sine and cosine values, this `new` function
    /// exists to reduce programmer effort.
    pub fn new(ra: f64, dec: f64) -> Self {
        Self {
            ra,
            s_ra: ra.sin(),
            c_ra: ra.cos(),
            dec,
            s_dec: dec.sin(),
            c_dec: dec.cos(),
        }
    }

    /// Like [`RADec::new`], but with arguments in degrees.
    pub fn new_degrees(ra: f64, dec: f64) -> Self {
        Self::new(ra.to_radians(), dec.to_radians())
    }

    /// Do two directions compare exactly equal? Used to decide whether a
    /// facet coincides with the reference direction, in which case its
    /// transforms must be bypassed entirely; an epsilon comparison would
    /// silently degrade that guarantee.
    pub(crate) fn bitwise_eq(&self, other: &Self) -> bool {
        self.ra == other.ra && self.dec == other.dec
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn new_caches_trig() {
        let radec = RADec::new(62.0_f64.to_radians(), (-27.5_f64).to_radians());
        assert_abs_diff_eq!(radec.s_ra, radec.ra.sin());
        assert_abs_diff_eq!(radec.c_ra, radec.ra.cos());
        assert_abs_diff_eq!(radec.s_dec, radec.dec.sin());
        assert_abs_diff_eq!(radec.c_dec, radec.dec.cos());
    }

    #[test]
    fn degrees_and_radians_agree() {
        let a = RADec::new_degrees(15.0, -30.0);
        let b = RADec::new(15.0_f64.to_radians(), (-30.0_f64).to_radians());
        assert!(a.bitwise_eq(&b));
    }
}
