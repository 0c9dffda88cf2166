use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::media::{media_track::MediaTrack, track_kind::TrackKind};

/// Ordered set of tracks produced by one acquisition.
#[derive(Debug)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<MediaTrack>>,
    released: AtomicBool,
}

impl MediaStream {
    pub(crate) fn new(id: String, tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            id,
            tracks,
            released: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Arc<MediaTrack>> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Ends every track and frees the capture devices. Idempotent.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.release();
    }
}
