use super::{FrameRequest, Host};

/// Self-rescheduling frame loop: every accepted frame requests the next one.
///
/// Only the most recent request is honoured. A callback that fires after
/// [`RenderLoop::stop`], or for a superseded request, is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderLoop {
    pending: Option<FrameRequest>,
    running: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn start<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.running {
            return;
        }
        self.running = true;
        self.pending = Some(host.request_frame());
    }

    /// Consume a fired callback. Returns `true` if this frame should render;
    /// the next frame is already requested when it does.
    pub fn accept<H: Host + ?Sized>(&mut self, fired: FrameRequest, host: &mut H) -> bool {
        if !self.running || self.pending != Some(fired) {
            tracing::trace!(?fired, "ignoring stale frame callback");
            return false;
        }
        self.frames += 1;
        self.pending = Some(host.request_frame());
        true
    }

    /// Cancel the pending request. Returns `true` if one was outstanding.
    pub fn stop<H: Host + ?Sized>(&mut self, host: &mut H) -> bool {
        self.running = false;
        match self.pending.take() {
            Some(request) => {
                host.cancel_frame(request);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameHost;

    #[test]
    fn each_frame_requests_the_next() {
        let mut host = FrameHost::default();
        let mut frames = RenderLoop::default();
        frames.start(&mut host);
        let first = frames.pending().unwrap();

        assert!(frames.accept(first, &mut host));
        let second = frames.pending().unwrap();
        assert_ne!(first, second);
        assert_eq!(frames.frames_rendered(), 1);

        // The old request is stale now.
        assert!(!frames.accept(first, &mut host));
        assert_eq!(frames.frames_rendered(), 1);
    }

    #[test]
    fn stop_cancels_and_ignores_late_callbacks() {
        let mut host = FrameHost::default();
        let mut frames = RenderLoop::default();
        frames.start(&mut host);
        let pending = frames.pending().unwrap();

        assert!(frames.stop(&mut host));
        assert!(!host.is_frame_pending(pending));
        assert!(!frames.accept(pending, &mut host));
        assert!(!frames.stop(&mut host));
        assert_eq!(frames.frames_rendered(), 0);
    }
}
