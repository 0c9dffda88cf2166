use sha2::{Digest, Sha256};

use crate::{
    media::TrackKind,
    sdp::{
        attribute::Attribute,
        media::{Media, MediaKind},
        origin::Origin,
        sdpc::Sdp,
    },
};

const DISCARD_PORT: u16 = 9;
const RTP_PROTO: &str = "UDP/TLS/RTP/SAVPF";
const SCTP_PROTO: &str = "UDP/DTLS/SCTP";
const DATACHANNEL_FMT: &str = "webrtc-datachannel";
const SCTP_PORT: &str = "5000";
const OPUS_PT: &str = "111";
const OPUS_RTPMAP: &str = "111 opus/48000/2";
const VP8_PT: &str = "96";
const VP8_RTPMAP: &str = "96 VP8/90000";

/// DTLS role advertised with `a=setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupRole {
    ActPass,
    Active,
    Passive,
}

impl SetupRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActPass => "actpass",
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}

/// A local track as it is announced in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackBinding {
    pub kind: TrackKind,
    pub stream_id: String,
    pub track_id: String,
}

/// What one `m=` section will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPlan {
    Send { mid: String, track: TrackBinding },
    Receive { mid: String, kind: TrackKind },
    Application { mid: String },
}

impl SectionPlan {
    #[must_use]
    pub fn mid(&self) -> &str {
        match self {
            Self::Send { mid, .. } | Self::Receive { mid, .. } | Self::Application { mid } => mid,
        }
    }
}

/// Renders an endpoint's offer or answer from its fixed identity and a list
/// of section plans. The same inputs always yield the same text.
#[derive(Debug, Clone)]
pub struct DescriptionBuilder<'a> {
    pub session_id: u64,
    pub session_version: u64,
    pub ice_ufrag: &'a str,
    pub ice_pwd: &'a str,
    pub fingerprint: &'a str,
    pub setup: SetupRole,
}

impl DescriptionBuilder<'_> {
    #[must_use]
    pub fn build(&self, sections: &[SectionPlan]) -> Sdp {
        let mut sdp = Sdp::new(Origin::local(self.session_id, self.session_version));

        if !sections.is_empty() {
            let mids: Vec<&str> = sections.iter().map(SectionPlan::mid).collect();
            sdp.attrs
                .push(Attribute::new("group", format!("BUNDLE {}", mids.join(" "))));
        }
        let mut streams: Vec<&str> = Vec::new();
        for plan in sections {
            if let SectionPlan::Send { track, .. } = plan {
                if !streams.contains(&track.stream_id.as_str()) {
                    streams.push(&track.stream_id);
                }
            }
        }
        let wms = if streams.is_empty() {
            "WMS".to_owned()
        } else {
            format!("WMS {}", streams.join(" "))
        };
        sdp.attrs.push(Attribute::new("msid-semantic", wms));

        // Nothing to negotiate yet; the credentials still have to reach the peer.
        if sections.is_empty() {
            sdp.attrs
                .push(Attribute::new("ice-ufrag", self.ice_ufrag.to_owned()));
            sdp.attrs.push(Attribute::new("ice-pwd", self.ice_pwd.to_owned()));
            sdp.attrs.push(Attribute::new(
                "fingerprint",
                format!("sha-256 {}", self.fingerprint),
            ));
        }

        for plan in sections {
            sdp.media.push(self.section(plan));
        }
        sdp
    }

    fn section(&self, plan: &SectionPlan) -> Media {
        let mut m = match plan {
            SectionPlan::Send { track, .. } => rtp_section(track.kind),
            SectionPlan::Receive { kind, .. } => rtp_section(*kind),
            SectionPlan::Application { .. } => Media::new(
                MediaKind::Application,
                DISCARD_PORT,
                SCTP_PROTO,
                vec![DATACHANNEL_FMT.to_owned()],
            ),
        };
        m.extra_lines.push("c=IN IP4 0.0.0.0".to_owned());
        m.push_attr(Attribute::new("mid", plan.mid().to_owned()));
        m.push_attr(Attribute::new("ice-ufrag", self.ice_ufrag.to_owned()));
        m.push_attr(Attribute::new("ice-pwd", self.ice_pwd.to_owned()));
        m.push_attr(Attribute::new("fingerprint", format!("sha-256 {}", self.fingerprint)));
        m.push_attr(Attribute::new("setup", self.setup.as_str().to_owned()));

        match plan {
            SectionPlan::Send { track, .. } => {
                m.push_attr(Attribute::flag("sendrecv"));
                m.push_attr(Attribute::new(
                    "msid",
                    format!("{} {}", track.stream_id, track.track_id),
                ));
                m.push_attr(Attribute::flag("rtcp-mux"));
                m.push_attr(Attribute::new("rtpmap", rtpmap(track.kind).to_owned()));
            }
            SectionPlan::Receive { kind, .. } => {
                m.push_attr(Attribute::flag("recvonly"));
                m.push_attr(Attribute::flag("rtcp-mux"));
                m.push_attr(Attribute::new("rtpmap", rtpmap(*kind).to_owned()));
            }
            SectionPlan::Application { .. } => {
                m.push_attr(Attribute::new("sctp-port", SCTP_PORT.to_owned()));
            }
        }
        m
    }
}

fn rtp_section(kind: TrackKind) -> Media {
    let pt = match kind {
        TrackKind::Audio => OPUS_PT,
        TrackKind::Video => VP8_PT,
    };
    Media::new(kind.into(), DISCARD_PORT, RTP_PROTO, vec![pt.to_owned()])
}

fn rtpmap(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Audio => OPUS_RTPMAP,
        TrackKind::Video => VP8_RTPMAP,
    }
}

/// SHA-256 over `identity`, formatted `AB:CD:...` for `a=fingerprint`.
#[must_use]
pub fn sha256_fingerprint(identity: &[u8]) -> String {
    let digest = Sha256::digest(identity);
    let hex: Vec<String> = digest.iter().map(|b| format!("{b:02X}")).collect();
    hex.join(":")
}
