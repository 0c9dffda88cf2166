use std::sync::atomic::{AtomicBool, Ordering};

use crate::media::{device_handle::DeviceHandle, track_kind::TrackKind};

/// One audio or video source. Shared read-only between the stream and every
/// endpoint it is attached to; only the owning stream ends it.
#[derive(Debug)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    ended: AtomicBool,
    device: DeviceHandle,
}

impl MediaTrack {
    pub(crate) fn new(id: String, kind: TrackKind, device: DeviceHandle) -> Self {
        Self {
            id,
            kind,
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            device,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    #[must_use]
    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Mutes or unmutes the track. No effect once the track has ended.
    pub fn set_enabled(&self, enabled: bool) {
        if !self.is_ended() {
            self.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub(crate) fn stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.ended.store(true, Ordering::SeqCst);
        self.device.release();
    }
}
