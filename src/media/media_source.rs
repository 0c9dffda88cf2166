use std::sync::Arc;

use async_trait::async_trait;

use crate::media::{
    media_constraints::MediaConstraints, media_error::MediaError, media_stream::MediaStream,
};

/// Produces local capture streams.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Opens the devices matching `constraints`.
    ///
    /// # Errors
    /// [`MediaError::PermissionDenied`] or [`MediaError::DeviceUnavailable`].
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Arc<MediaStream>, MediaError>;
}
