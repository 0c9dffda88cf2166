use std::fmt;

/// The ordered steps of one call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NegotiationStep {
    AcquireMedia,
    CreateEndpoints,
    WireCandidates,
    AttachTracks,
    CreateDataChannel,
    CreateOffer,
    ApplyLocalOffer,
    ApplyRemoteOffer,
    CreateAnswer,
    ApplyLocalAnswer,
    ApplyRemoteAnswer,
    OpenDataChannel,
}

impl NegotiationStep {
    /// Every step, in the order a call runs them.
    pub const ALL: [Self; 12] = [
        Self::AcquireMedia,
        Self::CreateEndpoints,
        Self::WireCandidates,
        Self::AttachTracks,
        Self::CreateDataChannel,
        Self::CreateOffer,
        Self::ApplyLocalOffer,
        Self::ApplyRemoteOffer,
        Self::CreateAnswer,
        Self::ApplyLocalAnswer,
        Self::ApplyRemoteAnswer,
        Self::OpenDataChannel,
    ];
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AcquireMedia => "acquire media",
            Self::CreateEndpoints => "create endpoints",
            Self::WireCandidates => "wire candidates",
            Self::AttachTracks => "attach tracks",
            Self::CreateDataChannel => "create data channel",
            Self::CreateOffer => "A.create_offer",
            Self::ApplyLocalOffer => "A.apply_local_description(offer)",
            Self::ApplyRemoteOffer => "B.apply_remote_description(offer)",
            Self::CreateAnswer => "B.create_answer",
            Self::ApplyLocalAnswer => "B.apply_local_description(answer)",
            Self::ApplyRemoteAnswer => "A.apply_remote_description(answer)",
            Self::OpenDataChannel => "open data channel",
        })
    }
}
