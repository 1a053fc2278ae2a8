//! Cyclic block counter driving task issue.

/// Position within the scheduling period `[1, 2·max_factor]`.
///
/// Reads 0 before the first cycle. Advancing past the period wraps to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    value: usize,
    period: usize,
}

impl CycleCounter {
    /// Counter for a plan with the given largest factor.
    pub fn new(max_factor: usize) -> Self {
        Self {
            value: 0,
            period: (2 * max_factor).max(1),
        }
    }

    /// Current cycle number (0 before the first advance).
    pub fn value(&self) -> usize {
        self.value
    }

    /// Counter period.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Move to the next cycle and return it.
    pub fn advance(&mut self) -> usize {
        self.value = if self.value >= self.period {
            1
        } else {
            self.value + 1
        };
        self.value
    }

    /// Whether blocks of `factor` are issued this cycle.
    pub fn is_due(&self, factor: usize) -> bool {
        factor != 0 && self.value % factor == 0
    }

    /// Counter value `wait` cycles from now, in `[1, period]`.
    pub fn target_after(&self, wait: usize) -> usize {
        match (self.value + wait) % self.period {
            0 => self.period,
            t => t,
        }
    }

    /// Back to the pre-start state.
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_to_one() {
        let mut counter = CycleCounter::new(4);
        let values: Vec<usize> = (0..10).map(|_| counter.advance()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7, 8, 1, 2]);
    }

    #[test]
    fn due_factors() {
        let mut counter = CycleCounter::new(4);
        for _ in 0..4 {
            counter.advance();
        }
        assert!(counter.is_due(1));
        assert!(counter.is_due(2));
        assert!(counter.is_due(4));
        counter.advance();
        assert!(counter.is_due(1));
        assert!(!counter.is_due(2));
    }

    #[test]
    fn target_maps_zero_to_period() {
        let mut counter = CycleCounter::new(4);
        for _ in 0..5 {
            counter.advance();
        }
        assert_eq!(counter.target_after(3), 8);
        assert_eq!(counter.target_after(4), 1);
        assert_eq!(counter.target_after(0), 5);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut counter = CycleCounter::new(2);
        counter.advance();
        counter.reset();
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.advance(), 1);
    }
}
