use std::collections::BTreeSet;

use error_stack::Report;

use super::{FrameRequest, Host, ListenerId, SurfaceId, SurfaceSize};
use crate::{ChartError, Result};

/// Container bookkeeping plus a frame queue. Requested frames fire when
/// [`FrameHost::advance`] is called: once per `Update` under Bevy, or
/// whenever a test decides.
#[derive(Debug)]
pub struct FrameHost {
    size: SurfaceSize,
    next_id: u64,
    mounted: BTreeSet<SurfaceId>,
    listeners: BTreeSet<ListenerId>,
    pending_frames: BTreeSet<FrameRequest>,
    cancelled_frames: u64,
}

impl Default for FrameHost {
    fn default() -> Self {
        Self::new(SurfaceSize::new(800, 600))
    }
}

impl FrameHost {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            next_id: 0,
            mounted: BTreeSet::new(),
            listeners: BTreeSet::new(),
            pending_frames: BTreeSet::new(),
            cancelled_frames: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    /// Fire every pending frame callback, as the display would on vsync.
    pub fn advance(&mut self) -> Vec<FrameRequest> {
        std::mem::take(&mut self.pending_frames).into_iter().collect()
    }

    pub fn is_frame_pending(&self, request: FrameRequest) -> bool {
        self.pending_frames.contains(&request)
    }

    pub fn pending_frame_count(&self) -> usize {
        self.pending_frames.len()
    }

    pub fn cancelled_frames(&self) -> u64 {
        self.cancelled_frames
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_mounted(&self, surface: SurfaceId) -> bool {
        self.mounted.contains(&surface)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Remove a surface from the container behind the chart's back.
    pub fn detach(&mut self, surface: SurfaceId) -> bool {
        self.mounted.remove(&surface)
    }
}

impl Host for FrameHost {
    fn container_size(&self) -> SurfaceSize {
        self.size
    }

    fn mount(&mut self, surface: SurfaceId) -> Result<()> {
        self.mounted.insert(surface);
        Ok(())
    }

    fn unmount(&mut self, surface: SurfaceId) -> Result<()> {
        if self.mounted.remove(&surface) {
            Ok(())
        } else {
            Err(Report::new(ChartError::DisposalFailure(format!(
                "surface {surface:?} is not attached to the container"
            ))))
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(&listener)
    }

    fn request_frame(&mut self) -> FrameRequest {
        let id = FrameRequest(self.next());
        self.pending_frames.insert(id);
        id
    }

    fn cancel_frame(&mut self, request: FrameRequest) -> bool {
        let removed = self.pending_frames.remove(&request);
        if removed {
            self.cancelled_frames += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_fires_each_request_once() {
        let mut host = FrameHost::default();
        let a = host.request_frame();
        let b = host.request_frame();
        assert!(host.cancel_frame(a));
        assert!(!host.cancel_frame(a));
        assert_eq!(host.cancelled_frames(), 1);
        assert_eq!(host.advance(), vec![b]);
        assert!(host.advance().is_empty());
    }

    #[test]
    fn listeners_and_mounts_are_tracked() {
        let mut host = FrameHost::new(SurfaceSize::new(640, 480));
        let listener = host.add_resize_listener();
        assert_eq!(host.listener_count(), 1);
        assert!(host.remove_resize_listener(listener));
        assert!(!host.remove_resize_listener(listener));

        let surface = SurfaceId(7);
        host.mount(surface).unwrap();
        assert!(host.is_mounted(surface));
        host.unmount(surface).unwrap();
        let err = host.unmount(surface).unwrap_err();
        assert!(matches!(err.current_context(), ChartError::DisposalFailure(_)));
    }
}
