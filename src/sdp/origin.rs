use std::fmt;

use crate::sdp::sdp_error::SdpError;

/// The `o=` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub net_type: String,
    pub addr_type: String,
    pub unicast_address: String,
}

impl Origin {
    /// Origin line as browsers write it: `- <id> <version> IN IP4 127.0.0.1`.
    #[must_use]
    pub fn local(session_id: u64, session_version: u64) -> Self {
        Self {
            username: "-".to_owned(),
            session_id,
            session_version,
            net_type: "IN".to_owned(),
            addr_type: "IP4".to_owned(),
            unicast_address: "127.0.0.1".to_owned(),
        }
    }

    /// Parses the text after `o=`.
    ///
    /// # Errors
    /// [`SdpError::Invalid`] unless there are exactly six fields.
    pub fn parse(rest: &str) -> Result<Self, SdpError> {
        let parts: Vec<_> = rest.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(SdpError::Invalid("o="));
        }
        if parts[4] != "IP4" && parts[4] != "IP6" {
            return Err(SdpError::Invalid("o= addrtype"));
        }
        Ok(Self {
            username: parts[0].to_owned(),
            session_id: parts[1].parse()?,
            session_version: parts[2].parse()?,
            net_type: parts[3].to_owned(),
            addr_type: parts[4].to_owned(),
            unicast_address: parts[5].to_owned(),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "o={} {} {} {} {} {}",
            self.username,
            self.session_id,
            self.session_version,
            self.net_type,
            self.addr_type,
            self.unicast_address
        )
    }
}
