// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::ops::{Add, AddAssign};

/// The side statistics record of a gridding run. Domain-level rejections
/// (flags, field mismatches, disabled channels, edge drops) never abort the
/// run; they are counted here instead. Per-facet records are summed into the
/// run total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GriddingStats {
    /// (row, channel) samples rejected because the row was flagged.
    pub samples_skipped_row_flag: u64,
    /// (row, channel) samples rejected because the row's field is not the
    /// field being imaged.
    pub samples_skipped_field: u64,
    /// (row, channel) samples rejected because the channel is not enabled.
    pub samples_skipped_disabled_channel: u64,
    /// Correlation terms whose weight was zeroed by a per-correlation flag.
    pub correlations_flagged: u64,
    /// (row, channel) samples accumulated into a coalescing run.
    pub samples_accumulated: u64,
    /// Coalesced accumulator flushes deposited through the convolution
    /// kernel.
    pub deposits: u64,
    /// Flushes dropped by the grid edge policy.
    pub edge_drops: u64,
}

impl Add for GriddingStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for GriddingStats {
    fn add_assign(&mut self, rhs: Self) {
        self.samples_skipped_row_flag += rhs.samples_skipped_row_flag;
        self.samples_skipped_field += rhs.samples_skipped_field;
        self.samples_skipped_disabled_channel += rhs.samples_skipped_disabled_channel;
        self.correlations_flagged += rhs.correlations_flagged;
        self.samples_accumulated += rhs.samples_accumulated;
        self.deposits += rhs.deposits;
        self.edge_drops += rhs.edge_drops;
    }
}
