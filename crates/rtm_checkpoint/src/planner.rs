//! Resident capacity planning.
//!
//! The planner asks a [`FrameAllocator`] for the whole run (`nt + 1` frames)
//! and halves the request on every refusal. The first request that succeeds
//! fixes the resident capacity for the lifetime of the collector.

use tracing::{info, warn};

use crate::budget::MemoryBudget;
use crate::error::{CollectorError, CollectorResult};

/// Smallest viable resident capacity.
///
/// The frame being read and the frame being written by one step must live in
/// distinct slots.
pub const MIN_RESIDENT_FRAMES: usize = 2;

/// Source of resident frame storage.
///
/// Implementations return `None` when they cannot provide `samples` zeroed
/// `f32` values; the planner then retries with a smaller request.
pub trait FrameAllocator: Send {
    /// Attempts to allocate `samples` zeroed samples.
    fn try_allocate(&self, samples: usize) -> Option<Vec<f32>>;
}

/// Heap allocator with optional budget cap.
///
/// Uses fallible reservation so an out-of-memory condition degrades the
/// capacity instead of aborting the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator {
    budget: Option<MemoryBudget>,
}

impl HeapAllocator {
    /// Creates an allocator limited only by the system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that refuses requests above `budget`.
    pub fn with_budget(budget: MemoryBudget) -> Self {
        Self {
            budget: Some(budget),
        }
    }

    /// Returns the budget if set.
    pub fn budget(&self) -> Option<&MemoryBudget> {
        self.budget.as_ref()
    }
}

impl FrameAllocator for HeapAllocator {
    fn try_allocate(&self, samples: usize) -> Option<Vec<f32>> {
        let bytes = samples.checked_mul(std::mem::size_of::<f32>())?;
        if let Some(budget) = &self.budget {
            if !budget.is_within_budget(bytes) {
                return None;
            }
            if budget.is_warning(bytes) {
                warn!(
                    bytes,
                    usage_pct = budget.usage_percentage(bytes),
                    "resident buffer above budget warning threshold"
                );
            }
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(samples).ok()?;
        buffer.resize(samples, 0.0);
        Some(buffer)
    }
}

/// Outcome of capacity planning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResidentPlan {
    /// Frames the run needs (`nt + 1`).
    pub desired: usize,
    /// Frames actually allocated (`max_nt`).
    pub capacity: usize,
    /// `true` when every frame of the run is resident.
    pub mem_fit: bool,
    /// Number of allocation attempts made.
    pub attempts: usize,
}

/// Decides how many frames stay resident.
///
/// # Example
///
/// ```rust
/// use rtm_checkpoint::planner::{HeapAllocator, MemoryBudgetPlanner};
///
/// let planner = MemoryBudgetPlanner::new();
/// let (plan, buffer) = planner.plan(11, 16, &HeapAllocator::new()).unwrap();
///
/// assert!(plan.mem_fit);
/// assert_eq!(plan.capacity, 11);
/// assert_eq!(buffer.len(), 11 * 16);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryBudgetPlanner {
    max_resident_frames: Option<usize>,
}

impl MemoryBudgetPlanner {
    /// Creates a planner whose first request is the full run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the first request at `frames`, forcing spill mode for longer runs.
    pub fn with_max_resident_frames(mut self, frames: usize) -> Self {
        self.max_resident_frames = Some(frames);
        self
    }

    /// Returns the resident frame cap if set.
    pub fn max_resident_frames(&self) -> Option<usize> {
        self.max_resident_frames
    }

    /// Allocates the resident buffer for a run of `desired_frames` frames.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::AllocationFailure` if no request of at least
    /// [`MIN_RESIDENT_FRAMES`] frames succeeds.
    pub fn plan(
        &self,
        desired_frames: usize,
        frame_len: usize,
        allocator: &dyn FrameAllocator,
    ) -> CollectorResult<(ResidentPlan, Vec<f32>)> {
        let frame_bytes = frame_len.saturating_mul(std::mem::size_of::<f32>());
        let mut request = match self.max_resident_frames {
            Some(cap) => desired_frames.min(cap),
            None => desired_frames,
        };
        let mut attempts = 0;

        while request >= MIN_RESIDENT_FRAMES {
            attempts += 1;
            let buffer = request
                .checked_mul(frame_len)
                .and_then(|samples| allocator.try_allocate(samples));

            if let Some(buffer) = buffer {
                let plan = ResidentPlan {
                    desired: desired_frames,
                    capacity: request,
                    mem_fit: request == desired_frames,
                    attempts,
                };
                info!(
                    desired = plan.desired,
                    capacity = plan.capacity,
                    mem_fit = plan.mem_fit,
                    attempts,
                    frame_bytes,
                    "resident buffer planned"
                );
                return Ok((plan, buffer));
            }

            warn!(request, frame_bytes, "resident allocation refused, halving");
            request /= 2;
        }

        Err(CollectorError::AllocationFailure {
            requested: desired_frames,
            frame_bytes,
            min_frames: MIN_RESIDENT_FRAMES,
        })
    }
}
