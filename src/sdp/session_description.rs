use crate::sdp::{sdp_error::SdpError, sdp_type::SdpType, sdpc::Sdp};

/// An offer or answer as handed between endpoints. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    payload: String,
}

impl SessionDescription {
    pub fn new<P: Into<String>>(sdp_type: SdpType, payload: P) -> Self {
        Self {
            sdp_type,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn from_sdp(sdp_type: SdpType, sdp: &Sdp) -> Self {
        Self::new(sdp_type, sdp.to_string_crlf())
    }

    #[must_use]
    pub fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// # Errors
    /// [`SdpError`] if the payload is not valid SDP.
    pub fn parse(&self) -> Result<Sdp, SdpError> {
        Sdp::parse(&self.payload)
    }
}
