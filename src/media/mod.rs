//! Local capture: tracks, streams and the source that opens them.
pub mod device_handle;
pub mod media_constraints;
pub mod media_error;
pub mod media_source;
pub mod media_stream;
pub mod media_track;
pub mod synthetic_source;
pub mod track_kind;

pub use media_constraints::MediaConstraints;
pub use media_error::MediaError;
pub use media_source::MediaSource;
pub use media_stream::MediaStream;
pub use media_track::MediaTrack;
pub use synthetic_source::SyntheticMediaSource;
pub use track_kind::TrackKind;
