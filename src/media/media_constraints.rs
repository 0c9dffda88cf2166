/// What the caller wants captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    #[must_use]
    pub const fn audio_video() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.video && !self.audio
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::audio_video()
    }
}
