use crate::sdp::{
    attribute::Attribute, media::Media, origin::Origin, sdp_error::SdpError, util::push_crlf,
};

/// A parsed session description: session-level lines plus its `m=` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdp {
    pub version: u8,
    pub origin: Origin,
    pub session_name: String,
    pub timing: (u64, u64),
    pub attrs: Vec<Attribute>,
    pub media: Vec<Media>,
    /// Session-level lines this parser does not model.
    pub extra_lines: Vec<String>,
}

impl Sdp {
    #[must_use]
    pub fn new(origin: Origin) -> Self {
        Self {
            version: 0,
            origin,
            session_name: "-".to_owned(),
            timing: (0, 0),
            attrs: Vec::new(),
            media: Vec::new(),
            extra_lines: Vec::new(),
        }
    }

    /// Parses SDP text. Lines may end in `\n` or `\r\n`.
    ///
    /// # Errors
    /// [`SdpError`] when `v=`, `o=` or `s=` is missing or any modelled line is malformed.
    pub fn parse(input: &str) -> Result<Self, SdpError> {
        let mut version: Option<u8> = None;
        let mut origin: Option<Origin> = None;
        let mut session_name: Option<String> = None;
        let mut timing = (0, 0);
        let mut attrs: Vec<Attribute> = Vec::new();
        let mut media: Vec<Media> = Vec::new();
        let mut extra_lines: Vec<String> = Vec::new();

        for raw in input.split('\n') {
            let line = raw.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let Some((prefix, rest)) = line.split_once('=') else {
                return Err(SdpError::Invalid("line without '='"));
            };
            match prefix {
                "v" => version = Some(rest.trim().parse::<u8>()?),
                "o" => origin = Some(Origin::parse(rest)?),
                "s" => session_name = Some(rest.to_owned()),
                "t" => {
                    let mut p = rest.split_whitespace();
                    let (Some(start), Some(stop)) = (p.next(), p.next()) else {
                        return Err(SdpError::Invalid("t="));
                    };
                    timing = (start.parse()?, stop.parse()?);
                }
                "m" => media.push(Media::parse(rest)?),
                "a" => {
                    let attr = Attribute::parse(rest);
                    match media.last_mut() {
                        Some(m) => m.push_attr(attr),
                        None => attrs.push(attr),
                    }
                }
                _ => match media.last_mut() {
                    Some(m) => m.extra_lines.push(line.to_owned()),
                    None => extra_lines.push(line.to_owned()),
                },
            }
        }

        Ok(Self {
            version: version.ok_or(SdpError::Missing("v="))?,
            origin: origin.ok_or(SdpError::Missing("o="))?,
            session_name: session_name.ok_or(SdpError::Missing("s="))?,
            timing,
            attrs,
            media,
            extra_lines,
        })
    }

    /// Value of the first session-level attribute named `key`.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key() == key)
            .and_then(Attribute::value)
    }

    /// Looks `key` up in the section first, then at session level.
    #[must_use]
    pub fn media_or_session_attr<'a>(&'a self, media: &'a Media, key: &str) -> Option<&'a str> {
        media.attr(key).or_else(|| self.attr(key))
    }

    pub fn to_string_crlf(&self) -> String {
        let mut out = String::new();
        push_crlf(&mut out, format_args!("v={}", self.version));
        push_crlf(&mut out, format_args!("{}", self.origin));
        push_crlf(&mut out, format_args!("s={}", self.session_name));
        push_crlf(&mut out, format_args!("t={} {}", self.timing.0, self.timing.1));
        for a in &self.attrs {
            push_crlf(&mut out, format_args!("{a}"));
        }
        for x in &self.extra_lines {
            push_crlf(&mut out, format_args!("{x}"));
        }
        for m in &self.media {
            let fmts = if m.fmts.is_empty() {
                String::new()
            } else {
                format!(" {}", m.fmts.join(" "))
            };
            push_crlf(
                &mut out,
                format_args!("m={} {} {}{}", m.kind, m.port, m.proto, fmts),
            );
            for x in &m.extra_lines {
                push_crlf(&mut out, format_args!("{x}"));
            }
            for a in &m.attrs {
                push_crlf(&mut out, format_args!("{a}"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::sdp::media::MediaKind;

    const BROWSER_OFFER: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=msid-semantic: WMS stream\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
a=mid:1\r\n";

    #[test]
    fn parses_sessions_and_sections() {
        let sdp = Sdp::parse(BROWSER_OFFER).unwrap();
        assert_eq!(sdp.origin.session_id, 4_611_731_400_430_051_336);
        assert_eq!(sdp.attr("group"), Some("BUNDLE 0 1"));
        assert_eq!(sdp.media.len(), 2);

        let audio = &sdp.media[0];
        assert_eq!(audio.kind, MediaKind::Audio);
        assert_eq!(audio.fmts, vec!["111"]);
        assert_eq!(audio.mid(), Some("0"));
        assert!(audio.has_flag("sendrecv"));
        assert_eq!(audio.extra_lines, vec!["c=IN IP4 0.0.0.0"]);

        assert_eq!(sdp.media[1].kind, MediaKind::Application);
        assert_eq!(sdp.media[1].fmts, vec!["webrtc-datachannel"]);
    }

    #[test]
    fn rendering_parses_back_to_the_same_value() {
        let sdp = Sdp::parse(BROWSER_OFFER).unwrap();
        let again = Sdp::parse(&sdp.to_string_crlf()).unwrap();
        assert_eq!(sdp, again);
    }

    #[test]
    fn missing_origin_is_reported() {
        let err = Sdp::parse("v=0\r\ns=-\r\nt=0 0\r\n").unwrap_err();
        assert_eq!(err, SdpError::Missing("o="));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Sdp::parse("hello there").is_err());
        assert!(matches!(
            Sdp::parse("v=zero\r\n"),
            Err(SdpError::ParseInt(_))
        ));
    }
}
