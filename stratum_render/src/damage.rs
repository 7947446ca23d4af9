// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage history for buffer-age repaints.

use alloc::collections::VecDeque;

use kurbo::Rect;
use stratum_core::region::Region;

/// Update regions of recent frames, newest first.
///
/// A back buffer of age `n` was last drawn `n` frames ago; bringing it up to
/// date means repainting whatever changed in the `n - 1` frames since.
#[derive(Clone, Debug)]
pub struct DamageJournal {
    log: VecDeque<Region>,
    capacity: usize,
}

impl DamageJournal {
    /// Creates a journal that remembers up to `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            log: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of frames remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns `true` if no frame is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Records the update region of the frame just presented.
    pub fn add(&mut self, damage: Region) {
        if self.capacity == 0 {
            return;
        }
        if self.log.len() == self.capacity {
            self.log.pop_back();
        }
        self.log.push_front(damage);
    }

    /// Forgets all history. The next [`accumulate`](Self::accumulate) falls
    /// back to the whole output.
    pub fn clear(&mut self) {
        self.log.clear();
    }

    /// Returns the area a back buffer of `buffer_age` must repaint.
    ///
    /// An unknown age (0) or an age beyond the history yields `fallback`.
    #[must_use]
    pub fn accumulate(&self, buffer_age: u32, fallback: Rect) -> Region {
        let age = buffer_age as usize;
        if age == 0 || age - 1 > self.log.len() {
            return Region::from_rect(fallback);
        }
        let mut region = Region::new();
        for damage in self.log.iter().take(age - 1) {
            region |= damage;
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

    fn rect(x: f64) -> Region {
        Region::from_rect(Rect::new(x, 0.0, x + 10.0, 10.0))
    }

    #[test]
    fn age_one_needs_nothing() {
        let mut journal = DamageJournal::new(4);
        journal.add(rect(0.0));
        assert!(journal.accumulate(1, FULL).is_empty());
    }

    #[test]
    fn age_accumulates_recent_frames() {
        let mut journal = DamageJournal::new(4);
        journal.add(rect(0.0));
        journal.add(rect(20.0));
        journal.add(rect(40.0));

        let mut expected = rect(40.0);
        expected |= &rect(20.0);
        assert_eq!(journal.accumulate(3, FULL), expected);
    }

    #[test]
    fn unknown_or_too_old_falls_back() {
        let mut journal = DamageJournal::new(2);
        journal.add(rect(0.0));
        journal.add(rect(20.0));
        journal.add(rect(40.0));
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.accumulate(0, FULL), Region::from_rect(FULL));
        assert_eq!(journal.accumulate(4, FULL), Region::from_rect(FULL));
        assert_eq!(journal.accumulate(3, FULL), {
            let mut r = rect(40.0);
            r |= &rect(20.0);
            r
        });
    }

    #[test]
    fn clear_forgets_history() {
        let mut journal = DamageJournal::new(2);
        journal.add(rect(0.0));
        journal.clear();
        assert!(journal.is_empty());
        assert_eq!(journal.accumulate(2, FULL), Region::from_rect(FULL));
    }
}
