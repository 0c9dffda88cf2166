use crate::media::TrackKind;

/// A track the peer announced in its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub kind: TrackKind,
    pub mid: String,
    pub stream_id: Option<String>,
    pub track_id: Option<String>,
}
