//! Memory budget for the resident frame buffer.
//!
//! A budget caps how many bytes the planner may hand to the resident buffer
//! regardless of what the allocator would grant, so runs on shared nodes can
//! be forced into spill mode deterministically.

/// Memory budget for resident frames.
///
/// # Example
///
/// ```rust
/// use rtm_checkpoint::MemoryBudget;
///
/// let budget = MemoryBudget::from_mb(64);
/// assert!(budget.is_within_budget(64 * 1024 * 1024));
/// assert!(!budget.is_within_budget(64 * 1024 * 1024 + 1));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryBudget {
    /// Maximum resident bytes
    max_bytes: usize,

    /// Fraction of the budget above which a grant is logged
    warning_threshold: f64,
}

impl MemoryBudget {
    /// Creates a budget of `max_bytes` bytes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rtm_checkpoint::MemoryBudget;
    ///
    /// let budget = MemoryBudget::new(50 * 1024 * 1024);
    /// assert_eq!(budget.max_bytes(), 50 * 1024 * 1024);
    /// ```
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            warning_threshold: 0.8,
        }
    }

    /// Creates a budget from megabytes.
    #[inline]
    pub fn from_mb(mb: usize) -> Self {
        Self::new(mb.saturating_mul(1024 * 1024))
    }

    /// Returns the maximum memory in bytes.
    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks if `bytes` fit in the budget.
    #[inline]
    pub fn is_within_budget(&self, bytes: usize) -> bool {
        bytes <= self.max_bytes
    }

    /// Checks if `bytes` exceed the warning threshold.
    #[inline]
    pub fn is_warning(&self, bytes: usize) -> bool {
        let threshold_bytes = (self.max_bytes as f64 * self.warning_threshold) as usize;
        bytes > threshold_bytes
    }

    /// Usage as a percentage of the budget.
    #[inline]
    pub fn usage_percentage(&self, bytes: usize) -> f64 {
        if self.max_bytes == 0 {
            return 100.0;
        }
        (bytes as f64 / self.max_bytes as f64) * 100.0
    }
}
