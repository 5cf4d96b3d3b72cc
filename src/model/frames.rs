//! Per-animation-frame callback scheduling with cancellable handles.

/// Handle for one requested animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(u64);

/// Pending animation-frame requests
///
/// The host drains due handles once per redraw; a cancelled handle is
/// never returned.
#[derive(Debug, Default)]
pub struct AnimationFrames {
    next_id: u64,
    pending: Vec<FrameHandle>,
}

impl AnimationFrames {
    pub fn request(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    pub fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|&h| h != handle);
    }

    /// Take every handle requested before this call
    pub fn take_due(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_handle_is_not_due() {
        let mut frames = AnimationFrames::default();
        let a = frames.request();
        let b = frames.request();
        frames.cancel(a);
        assert_eq!(frames.take_due(), vec![b]);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut frames = AnimationFrames::default();
        let a = frames.request();
        frames.cancel(a);
        let b = frames.request();
        assert_ne!(a, b);
    }
}
