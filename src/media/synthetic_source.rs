use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rand::{RngCore, rngs::OsRng};

use crate::media::{
    device_handle::DeviceHandle, media_constraints::MediaConstraints, media_error::MediaError,
    media_source::MediaSource, media_stream::MediaStream, media_track::MediaTrack,
    track_kind::TrackKind,
};

const CAMERA_ID: &str = "synthetic-camera-0";
const CAMERA_LABEL: &str = "Synthetic Camera";
const MIC_ID: &str = "synthetic-mic-0";
const MIC_LABEL: &str = "Synthetic Microphone";

/// In-process stand-in for the browser's capture devices.
///
/// Permission and device presence can be flipped at runtime so callers can
/// exercise the failure paths. `live_captures` counts open device handles.
#[derive(Debug)]
pub struct SyntheticMediaSource {
    permission_granted: AtomicBool,
    camera_present: AtomicBool,
    microphone_present: AtomicBool,
    open_delay: Duration,
    live: Arc<AtomicUsize>,
}

impl Default for SyntheticMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticMediaSource {
    /// One camera and one microphone, permission granted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permission_granted: AtomicBool::new(true),
            camera_present: AtomicBool::new(true),
            microphone_present: AtomicBool::new(true),
            open_delay: Duration::ZERO,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulates the time a real device takes to open.
    #[must_use]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_camera_present(&self, present: bool) {
        self.camera_present.store(present, Ordering::SeqCst);
    }

    pub fn set_microphone_present(&self, present: bool) {
        self.microphone_present.store(present, Ordering::SeqCst);
    }

    /// Device handles currently held by un-released streams.
    #[must_use]
    pub fn live_captures(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn check(&self, constraints: MediaConstraints) -> Result<(), MediaError> {
        if constraints.is_empty() {
            return Err(MediaError::DeviceUnavailable(
                "neither audio nor video requested".into(),
            ));
        }
        if !self.permission_granted.load(Ordering::SeqCst) {
            let what = match (constraints.video, constraints.audio) {
                (true, true) => "camera and microphone",
                (true, false) => "camera",
                _ => "microphone",
            };
            return Err(MediaError::PermissionDenied(what.into()));
        }
        if constraints.video && !self.camera_present.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceUnavailable("camera".into()));
        }
        if constraints.audio && !self.microphone_present.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceUnavailable("microphone".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Arc<MediaStream>, MediaError> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.check(constraints)?;

        let stream_id = format!("{:016x}", OsRng.next_u64());
        let mut tracks = Vec::with_capacity(2);
        if constraints.audio {
            let device = DeviceHandle::open(MIC_ID, MIC_LABEL, Arc::clone(&self.live));
            tracks.push(Arc::new(MediaTrack::new(
                format!("{stream_id}-audio"),
                TrackKind::Audio,
                device,
            )));
        }
        if constraints.video {
            let device = DeviceHandle::open(CAMERA_ID, CAMERA_LABEL, Arc::clone(&self.live));
            tracks.push(Arc::new(MediaTrack::new(
                format!("{stream_id}-video"),
                TrackKind::Video,
                device,
            )));
        }
        Ok(Arc::new(MediaStream::new(stream_id, tracks)))
    }
}
