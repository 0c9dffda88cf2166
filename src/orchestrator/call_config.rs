use std::time::Duration;

use crate::{
    config::{Config, ConfigError},
    media::MediaConstraints,
};

const DEFAULT_LABEL: &str = "chat";
const DEFAULT_COMPONENT: u8 = 1;

/// Per-call settings, read from the `[Media]`, `[Chat]`, `[Negotiation]`
/// and `[Ice]` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    pub constraints: MediaConstraints,
    pub chat_label: String,
    /// `None` means no deadline.
    pub timeout: Option<Duration>,
    pub ice_component: u8,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::audio_video(),
            chat_label: DEFAULT_LABEL.to_owned(),
            timeout: None,
            ice_component: DEFAULT_COMPONENT,
        }
    }
}

impl CallConfig {
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a non-boolean media flag, a
    /// non-numeric timeout or a component outside 1..=255.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let constraints = MediaConstraints {
            video: config.get_bool("Media", "video", true)?,
            audio: config.get_bool("Media", "audio", true)?,
        };
        let chat_label = config
            .get_non_empty_or_default("Chat", "label", DEFAULT_LABEL)
            .to_owned();
        let timeout_ms = config.get_u64("Negotiation", "timeout_ms", 0)?;
        let component = config.get_u64("Ice", "component", u64::from(DEFAULT_COMPONENT))?;
        let ice_component = u8::try_from(component)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                section: "Ice".to_owned(),
                key: "component".to_owned(),
                value: component.to_string(),
            })?;

        Ok(Self {
            constraints,
            chat_label,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            ice_component,
        })
    }
}
