use std::fmt;

use crate::{
    media::TrackKind,
    sdp::{attribute::Attribute, sdp_error::SdpError},
};

/// The `<media>` token of an `m=` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Application,
    Other(String),
}

impl MediaKind {
    #[must_use]
    pub fn track_kind(&self) -> Option<TrackKind> {
        match self {
            Self::Audio => Some(TrackKind::Audio),
            Self::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

impl From<TrackKind> for MediaKind {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => Self::Audio,
            TrackKind::Video => Self::Video,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
            Self::Application => f.write_str("application"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "application" => Self::Application,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One `m=` section with the attributes that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    pub port: u16,
    pub proto: String,
    pub fmts: Vec<String>,
    pub attrs: Vec<Attribute>,
    /// Lines other than `a=` kept for rendering back.
    pub extra_lines: Vec<String>,
}

impl Media {
    pub fn new<P: Into<String>>(kind: MediaKind, port: u16, proto: P, fmts: Vec<String>) -> Self {
        Self {
            kind,
            port,
            proto: proto.into(),
            fmts,
            attrs: Vec::new(),
            extra_lines: Vec::new(),
        }
    }

    /// Parses the text after `m=`: `<media> <port>[/<num>] <proto> <fmt>...`.
    ///
    /// # Errors
    /// [`SdpError`] on a missing token or a non-numeric port.
    pub fn parse(rest: &str) -> Result<Self, SdpError> {
        let mut p = rest.split_whitespace();
        let Some(kind) = p.next() else {
            return Err(SdpError::Invalid("m="));
        };
        let Some(port_tok) = p.next() else {
            return Err(SdpError::Invalid("m= port"));
        };
        let port = match port_tok.split_once('/') {
            Some((base, _num)) => base.parse::<u16>()?,
            None => port_tok.parse::<u16>()?,
        };
        let Some(proto) = p.next() else {
            return Err(SdpError::Invalid("m= proto"));
        };
        let fmts = p.map(str::to_owned).collect();
        Ok(Self::new(MediaKind::from(kind), port, proto, fmts))
    }

    pub fn push_attr(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    /// Value of the first attribute named `key`.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key() == key)
            .and_then(Attribute::value)
    }

    #[must_use]
    pub fn has_flag(&self, key: &str) -> bool {
        self.attrs.iter().any(|a| a.key() == key)
    }

    pub fn attrs_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attrs.iter().filter(move |a| a.key() == key)
    }

    #[must_use]
    pub fn mid(&self) -> Option<&str> {
        self.attr("mid")
    }
}
