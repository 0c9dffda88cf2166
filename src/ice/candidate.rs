use crate::ice::candidate_type::CandidateType;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

/// Type preferences, RFC 8445 §5.1.2.2 recommended values.
const HOST_TYPE_PREF: u32 = 126;
const PEER_REFLEXIVE_TYPE_PREF: u32 = 110;
const SERVER_REFLEXIVE_TYPE_PREF: u32 = 100;
const RELAYED_TYPE_PREF: u32 = 0;

/// Single-interface host: maximum local preference.
const MAX_LOCAL_PREF: u16 = u16::MAX;

/// RFC 8445 §5.1.2.1
const TYPE_PREF_SHIFT: u32 = 24;
const LOCAL_PREF_SHIFT: u32 = 8;
const COMPONENT_OFFSET: u32 = 256;

const CANDIDATE_PREFIX: &str = "candidate:";
const MIN_TOKENS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateParseError {
    #[error("candidate line has {0} tokens, expected at least 8")]
    TooShort(usize),
    #[error("invalid {0} in candidate line")]
    InvalidField(&'static str),
    #[error("missing 'typ' token in candidate line")]
    MissingTyp,
    #[error("{0}")]
    UnknownType(String),
}

/// A transport address an endpoint offers for connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Groups candidates sharing type, base and transport.
    pub foundation: String,
    /// 1 = RTP/data, 2 = RTCP.
    pub component: u8,
    /// Lowercase transport, `udp` here.
    pub transport: String,
    pub priority: u32,
    pub address: SocketAddr,
    pub cand_type: CandidateType,
    /// Base address for reflexive/relayed candidates.
    pub related_address: Option<SocketAddr>,
}

impl Candidate {
    /// Builds a candidate; an empty foundation or zero priority is computed.
    #[must_use]
    pub fn new(
        foundation: String,
        component: u8,
        transport: &str,
        priority: u32,
        address: SocketAddr,
        cand_type: CandidateType,
        related_address: Option<SocketAddr>,
    ) -> Self {
        let transport = transport.to_ascii_lowercase();

        let foundation = if foundation.is_empty() {
            Self::calculate_foundation(cand_type, &transport, address.ip())
        } else {
            foundation
        };

        let priority = if priority == 0 {
            Self::calculate_priority(cand_type, MAX_LOCAL_PREF, component)
        } else {
            priority
        };

        Self {
            foundation,
            component,
            transport,
            priority,
            address,
            cand_type,
            related_address,
        }
    }

    #[must_use]
    pub fn host(address: SocketAddr, transport: &str, component: u8) -> Self {
        Self::new(
            String::new(),
            component,
            transport,
            0,
            address,
            CandidateType::Host,
            None,
        )
    }

    // RFC 8445 §5.1.1.3: any stable identifier will do.
    fn calculate_foundation(cand_type: CandidateType, transport_lc: &str, base_ip: IpAddr) -> String {
        let mut hasher = DefaultHasher::new();
        format!("{cand_type:?}-{transport_lc}-{base_ip}").hash(&mut hasher);
        format!("{:x}", hasher.finish() & 0xffff_ffff)
    }

    // RFC 8445 §5.1.2.1
    const fn calculate_priority(cand_type: CandidateType, local_pref: u16, component_id: u8) -> u32 {
        let type_pref = match cand_type {
            CandidateType::Host => HOST_TYPE_PREF,
            CandidateType::ServerReflexive => SERVER_REFLEXIVE_TYPE_PREF,
            CandidateType::PeerReflexive => PEER_REFLEXIVE_TYPE_PREF,
            CandidateType::Relayed => RELAYED_TYPE_PREF,
        };

        (type_pref << TYPE_PREF_SHIFT)
            | ((local_pref as u32) << LOCAL_PREF_SHIFT)
            | (COMPONENT_OFFSET - component_id as u32)
    }

    /// The `a=candidate:` attribute value, prefix included.
    #[must_use]
    pub fn to_sdp_line(&self) -> String {
        format!("{CANDIDATE_PREFIX}{self}")
    }
}

/// SDP grammar: `foundation component transport priority ip port typ type [raddr ip rport port]`.
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.transport,
            self.priority,
            self.address.ip(),
            self.address.port(),
            self.cand_type,
        )?;
        if let Some(rel) = self.related_address {
            write!(f, " raddr {} rport {}", rel.ip(), rel.port())?;
        }
        Ok(())
    }
}

impl FromStr for Candidate {
    type Err = CandidateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("a=").unwrap_or(s);
        let s = s.strip_prefix(CANDIDATE_PREFIX).unwrap_or(s);

        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() < MIN_TOKENS {
            return Err(CandidateParseError::TooShort(parts.len()));
        }

        let foundation = parts[0].to_string();
        let component: u8 = parts[1]
            .parse()
            .map_err(|_| CandidateParseError::InvalidField("component"))?;
        let transport = parts[2].to_ascii_lowercase();
        let priority: u32 = parts[3]
            .parse()
            .map_err(|_| CandidateParseError::InvalidField("priority"))?;
        let ip: IpAddr = parts[4]
            .parse()
            .map_err(|_| CandidateParseError::InvalidField("address"))?;
        let port: u16 = parts[5]
            .parse()
            .map_err(|_| CandidateParseError::InvalidField("port"))?;
        if parts[6] != "typ" {
            return Err(CandidateParseError::MissingTyp);
        }
        let cand_type: CandidateType = parts[7].parse().map_err(CandidateParseError::UnknownType)?;

        // Extension pairs; unknown keys (generation, ufrag, network-id...) are skipped.
        let mut raddr: Option<IpAddr> = None;
        let mut rport: Option<u16> = None;
        for pair in parts[MIN_TOKENS..].chunks_exact(2) {
            match pair[0] {
                "raddr" => {
                    raddr = Some(
                        pair[1]
                            .parse()
                            .map_err(|_| CandidateParseError::InvalidField("raddr"))?,
                    );
                }
                "rport" => {
                    rport = Some(
                        pair[1]
                            .parse()
                            .map_err(|_| CandidateParseError::InvalidField("rport"))?,
                    );
                }
                _ => {}
            }
        }
        let related_address = raddr.map(|ip| SocketAddr::new(ip, rport.unwrap_or(0)));

        Ok(Candidate {
            foundation,
            component,
            transport,
            priority,
            address: SocketAddr::new(ip, port),
            cand_type,
            related_address,
        })
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn host_candidate_gets_computed_priority_and_foundation() {
        let addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let c = Candidate::host(addr, "UDP", 1);
        assert_eq!(c.transport, "udp");
        assert_eq!(c.priority, (126 << 24) | (65535 << 8) | 255);
        assert!(!c.foundation.is_empty());
    }

    #[test]
    fn foundation_differs_by_base_ip() {
        let f1 = Candidate::calculate_foundation(CandidateType::Host, "udp", "192.168.0.10".parse().unwrap());
        let f2 = Candidate::calculate_foundation(CandidateType::Host, "udp", "192.168.0.11".parse().unwrap());
        assert_ne!(f1, f2);
    }

    #[test]
    fn host_outranks_relay() {
        let host_p = Candidate::calculate_priority(CandidateType::Host, 65535, 1);
        let relay_p = Candidate::calculate_priority(CandidateType::Relayed, 65535, 1);
        assert!(host_p > relay_p);
    }

    #[test]
    fn sdp_line_parses_back() {
        let addr: SocketAddr = "127.0.0.1:50001".parse().unwrap();
        let c = Candidate::host(addr, "udp", 1);
        let line = c.to_sdp_line();
        assert!(line.starts_with("candidate:"));
        assert!(line.ends_with("127.0.0.1 50001 typ host"));
        assert_eq!(line.parse::<Candidate>().unwrap(), c);
    }

    #[test]
    fn parses_browser_style_srflx_line() {
        let line = "candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx raddr 10.0.0.4 rport 46154 generation 0 ufrag abcd";
        let c: Candidate = line.parse().unwrap();
        assert_eq!(c.cand_type, CandidateType::ServerReflexive);
        assert_eq!(c.address, "203.0.113.7:46154".parse().unwrap());
        assert_eq!(c.related_address, Some("10.0.0.4:46154".parse().unwrap()));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Candidate>(), Err(CandidateParseError::TooShort(0)));
        assert_eq!(
            "1 1 udp 10 not-an-ip 9 typ host".parse::<Candidate>(),
            Err(CandidateParseError::InvalidField("address"))
        );
        assert_eq!(
            "1 1 udp 10 127.0.0.1 9 kind host".parse::<Candidate>(),
            Err(CandidateParseError::MissingTyp)
        );
        assert!(matches!(
            "1 1 udp 10 127.0.0.1 9 typ wormhole".parse::<Candidate>(),
            Err(CandidateParseError::UnknownType(_))
        ));
    }
}
