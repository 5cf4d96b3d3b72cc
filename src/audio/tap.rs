//! Bounded sample queue shared between device callbacks and the audio graph.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default capacity: two seconds of mono audio at 48 kHz
const DEFAULT_CAPACITY: usize = 96_000;

/// Mono sample queue (thread-safe, cheap to clone)
///
/// Device threads push, the graph drains once per animation frame.
/// When full, the oldest samples are dropped.
#[derive(Clone, Debug)]
pub struct SampleTap {
    buffer: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl Default for SampleTap {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SampleTap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Append samples, evicting the oldest ones past capacity
    pub fn push_slice(&self, samples: &[f32]) {
        let Ok(mut buffer) = self.buffer.lock() else {
            return;
        };
        buffer.extend(samples.iter().copied());
        let excess = buffer.len().saturating_sub(self.capacity);
        if excess > 0 {
            buffer.drain(..excess);
        }
    }

    /// Take everything queued so far
    pub fn drain(&self) -> Vec<f32> {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_in_order() {
        let tap = SampleTap::default();
        tap.push_slice(&[0.1, 0.2]);
        tap.push_slice(&[0.3]);
        assert_eq!(tap.drain(), vec![0.1, 0.2, 0.3]);
        assert!(tap.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let tap = SampleTap::with_capacity(3);
        tap.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(tap.drain(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clones_share_buffer() {
        let tap = SampleTap::default();
        let writer = tap.clone();
        writer.push_slice(&[0.5]);
        assert_eq!(tap.len(), 1);
    }
}
