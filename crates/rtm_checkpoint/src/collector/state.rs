//! Collector state machine and resident ring buffer.

use std::fmt;

/// Lifecycle of one collector run.
///
/// ```text
/// Uninitialized -> ForwardActive -> ForwardComplete -> BackwardActive -> Done
/// ```
///
/// A forward reset is accepted from every state and starts a new shot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectorState {
    /// No reset has happened yet.
    #[default]
    Uninitialized,
    /// Forward frames are being saved.
    ForwardActive,
    /// All `nt + 1` forward frames are saved.
    ForwardComplete,
    /// Frames are being fetched in reverse order.
    BackwardActive,
    /// Frame 0 has been fetched.
    Done,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectorState::Uninitialized => "uninitialized",
            CollectorState::ForwardActive => "forward-active",
            CollectorState::ForwardComplete => "forward-complete",
            CollectorState::BackwardActive => "backward-active",
            CollectorState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How frames of the current shot are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResidentMode {
    /// Every frame of the shot is resident; no chunk I/O.
    FullFit,
    /// The buffer is a ring of `capacity` slots spilled chunk by chunk.
    Spill,
}

impl ResidentMode {
    /// Mode for a shot of `frames` frames on a buffer of `capacity` slots.
    pub fn select(capacity: usize, frames: usize) -> Self {
        if capacity >= frames {
            ResidentMode::FullFit
        } else {
            ResidentMode::Spill
        }
    }
}

impl fmt::Display for ResidentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidentMode::FullFit => f.write_str("full-fit"),
            ResidentMode::Spill => f.write_str("spill"),
        }
    }
}

/// One contiguous allocation of `capacity` frame slots.
///
/// Frame `t` lives in slot `t % capacity`.
#[derive(Debug)]
pub struct ResidentBuffer {
    data: Vec<f32>,
    frame_len: usize,
    capacity: usize,
}

impl ResidentBuffer {
    /// Wraps `data`, whose length must be a positive multiple of `frame_len`.
    pub fn new(data: Vec<f32>, frame_len: usize) -> Self {
        debug_assert!(frame_len > 0 && data.len() % frame_len == 0);
        let capacity = data.len() / frame_len;
        Self {
            data,
            frame_len,
            capacity,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples per frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Samples in the underlying allocation.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.data.len()
    }

    /// Re-slices the allocation into `capacity` slots of `frame_len`
    /// samples. Returns `false`, leaving the layout unchanged, when they do
    /// not fit.
    pub fn reshape(&mut self, frame_len: usize) -> bool {
        let fits = frame_len > 0
            && self
                .capacity
                .checked_mul(frame_len)
                .is_some_and(|samples| samples <= self.data.len());
        if fits {
            self.frame_len = frame_len;
        }
        fits
    }

    /// Slot holding frame `t`.
    #[inline]
    pub fn slot_of(&self, t: usize) -> usize {
        t % self.capacity
    }

    /// Samples of slot `slot`.
    #[inline]
    pub fn slot(&self, slot: usize) -> &[f32] {
        let start = slot * self.frame_len;
        &self.data[start..start + self.frame_len]
    }

    /// Two distinct slots, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`.
    pub fn slot_pair_mut(&mut self, a: usize, b: usize) -> (&mut [f32], &mut [f32]) {
        assert_ne!(a, b, "slot pair must be distinct");
        let len = self.frame_len;
        if a < b {
            let (low, high) = self.data.split_at_mut(b * len);
            (&mut low[a * len..(a + 1) * len], &mut high[..len])
        } else {
            let (low, high) = self.data.split_at_mut(a * len);
            (&mut high[..len], &mut low[b * len..(b + 1) * len])
        }
    }

    /// Slots `0..count` as one contiguous slice.
    #[inline]
    pub fn leading(&self, count: usize) -> &[f32] {
        &self.data[..count * self.frame_len]
    }

    /// Slots `0..count` as one contiguous mutable slice.
    #[inline]
    pub fn leading_mut(&mut self, count: usize) -> &mut [f32] {
        &mut self.data[..count * self.frame_len]
    }

    /// Zeroes slots `0..count`.
    pub fn zero_leading(&mut self, count: usize) {
        let count = count.min(self.capacity);
        self.leading_mut(count).fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(capacity: usize, frame_len: usize) -> ResidentBuffer {
        let data = (0..capacity * frame_len).map(|i| i as f32).collect();
        ResidentBuffer::new(data, frame_len)
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(ResidentMode::select(11, 11), ResidentMode::FullFit);
        assert_eq!(ResidentMode::select(20, 11), ResidentMode::FullFit);
        assert_eq!(ResidentMode::select(4, 11), ResidentMode::Spill);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CollectorState::default().to_string(), "uninitialized");
        assert_eq!(CollectorState::BackwardActive.to_string(), "backward-active");
        assert_eq!(ResidentMode::Spill.to_string(), "spill");
    }

    #[test]
    fn test_ring_slots() {
        let buf = buffer(4, 3);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.slot_of(9), 1);
        assert_eq!(buf.slot(2), &[6.0, 7.0, 8.0]);
        assert_eq!(buf.leading(2).len(), 6);
    }

    #[test]
    fn test_reshape_keeps_capacity() {
        let mut buf = buffer(4, 3);
        assert!(buf.reshape(2));
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.frame_len(), 2);
        assert_eq!(buf.slot(3), &[6.0, 7.0]);
        assert_eq!(buf.allocated(), 12);

        assert!(buf.reshape(3));
        assert!(!buf.reshape(4));
        assert!(!buf.reshape(0));
        assert_eq!(buf.frame_len(), 3);
    }

    #[test]
    fn test_slot_pair_both_orders() {
        let mut buf = buffer(3, 2);
        {
            let (a, b) = buf.slot_pair_mut(0, 2);
            assert_eq!(a, &[0.0, 1.0]);
            assert_eq!(b, &[4.0, 5.0]);
            b[0] = -1.0;
        }
        let (a, b) = buf.slot_pair_mut(2, 1);
        assert_eq!(a, &[-1.0, 5.0]);
        assert_eq!(b, &[2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn test_slot_pair_same_slot_panics() {
        buffer(2, 2).slot_pair_mut(1, 1);
    }

    #[test]
    fn test_zero_leading() {
        let mut buf = buffer(3, 2);
        buf.zero_leading(2);
        assert!(buf.leading(2).iter().all(|&x| x == 0.0));
        assert_eq!(buf.slot(2), &[4.0, 5.0]);
    }
}
