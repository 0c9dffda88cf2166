use crate::sdp::{
    media::{Media, MediaKind},
    sdp_error::SdpError,
    sdpc::Sdp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    fn of(media: &Media) -> Self {
        if media.has_flag("sendonly") {
            Self::SendOnly
        } else if media.has_flag("recvonly") {
            Self::RecvOnly
        } else if media.has_flag("inactive") {
            Self::Inactive
        } else {
            Self::SendRecv
        }
    }

    /// True if the side that wrote the section sends media on it.
    #[must_use]
    pub fn sends(self) -> bool {
        matches!(self, Self::SendRecv | Self::SendOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    pub mid: String,
    pub kind: MediaKind,
    pub direction: Direction,
    /// `(stream id, track id)` from `a=msid`.
    pub msid: Option<(String, String)>,
}

/// What an endpoint needs from a peer's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionSummary {
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub fingerprint: Option<String>,
    pub sections: Vec<SectionSummary>,
}

impl DescriptionSummary {
    /// # Errors
    /// [`SdpError::Missing`] when a section lacks `a=mid` or the ICE credentials
    /// are absent at both section and session level.
    pub fn from_sdp(sdp: &Sdp) -> Result<Self, SdpError> {
        let mut ice_ufrag = sdp.attr("ice-ufrag").map(str::to_owned);
        let mut ice_pwd = sdp.attr("ice-pwd").map(str::to_owned);
        let mut fingerprint = sdp.attr("fingerprint").map(str::to_owned);
        let mut sections = Vec::with_capacity(sdp.media.len());

        for m in &sdp.media {
            let mid = m.mid().ok_or(SdpError::Missing("a=mid"))?;
            if ice_ufrag.is_none() {
                ice_ufrag = m.attr("ice-ufrag").map(str::to_owned);
            }
            if ice_pwd.is_none() {
                ice_pwd = m.attr("ice-pwd").map(str::to_owned);
            }
            if fingerprint.is_none() {
                fingerprint = m.attr("fingerprint").map(str::to_owned);
            }
            let msid = m.attr("msid").and_then(|v| {
                let mut it = v.split_whitespace();
                Some((it.next()?.to_owned(), it.next()?.to_owned()))
            });
            sections.push(SectionSummary {
                mid: mid.to_owned(),
                kind: m.kind.clone(),
                direction: Direction::of(m),
                msid,
            });
        }

        Ok(Self {
            ice_ufrag: ice_ufrag.ok_or(SdpError::Missing("a=ice-ufrag"))?,
            ice_pwd: ice_pwd.ok_or(SdpError::Missing("a=ice-pwd"))?,
            fingerprint,
            sections,
        })
    }

    /// Audio/video sections on which the peer sends media.
    pub fn sending_tracks(&self) -> impl Iterator<Item = &SectionSummary> {
        self.sections
            .iter()
            .filter(|s| s.kind.track_kind().is_some() && s.direction.sends())
    }

    #[must_use]
    pub fn has_application(&self) -> bool {
        self.sections
            .iter()
            .any(|s| s.kind == MediaKind::Application)
    }
}
