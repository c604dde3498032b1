//! Skip/Take folding.
//!
//! Repeated Skip and Take calls collapse into one window `[skip, skip + take)`
//! over the unfiltered result stream. Skip after Take shrinks the window; Take
//! after Skip caps it. Once the window is empty it stays empty.

/// A folded skip/take window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    skip: Option<u64>,
    take: Option<u64>,
}

impl Paging {
    /// Creates an unbounded window.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip: None,
            take: None,
        }
    }

    /// Applies `Skip(count)`. Negative counts skip nothing.
    pub fn apply_skip(&mut self, count: i64) {
        if self.is_empty() {
            return;
        }
        let count = clamp(count);
        if let Some(take) = self.take {
            if count >= take {
                self.take = Some(0);
                self.skip = None;
                return;
            }
            self.take = Some(take - count);
        }
        self.skip = Some(self.skip.unwrap_or(0).saturating_add(count));
    }

    /// Applies `Take(count)`. Negative counts take nothing.
    pub fn apply_take(&mut self, count: i64) {
        let count = clamp(count);
        let take = self.take.map_or(count, |existing| existing.min(count));
        self.take = Some(take);
        if take == 0 {
            self.skip = None;
        }
    }

    /// Returns the folded offset, if any Skip was applied.
    #[must_use]
    pub const fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// Returns the folded limit, if any Take was applied.
    #[must_use]
    pub const fn take(&self) -> Option<u64> {
        self.take
    }

    /// Returns `true` if either bound was applied.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }

    /// Returns `true` once the window can yield nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.take, Some(0))
    }
}

fn clamp(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
