use crate::ice::candidate::{Candidate, CandidateParseError};

/// A trickled candidate as it travels through the relay: the SDP candidate
/// line plus the media section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: u16,
}

impl IceCandidate {
    #[must_use]
    pub fn new(candidate: impl Into<String>, sdp_mid: Option<String>, sdp_mline_index: u16) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_mline_index,
        }
    }

    #[must_use]
    pub fn from_candidate(c: &Candidate, sdp_mid: Option<String>, sdp_mline_index: u16) -> Self {
        Self::new(c.to_sdp_line(), sdp_mid, sdp_mline_index)
    }

    /// Parses the carried line.
    ///
    /// # Errors
    /// [`CandidateParseError`] if the line does not follow the SDP grammar.
    pub fn parse(&self) -> Result<Candidate, CandidateParseError> {
        self.candidate.parse()
    }
}
