use crate::ice::candidate::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceRole {
    /// Offering side; nominates the pair.
    Controlling,
    /// Answering side.
    Controlled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair {
    pub local: Candidate,
    pub remote: Candidate,
    pub priority: u64,
}

impl CandidatePair {
    #[must_use]
    pub fn new(local: Candidate, remote: Candidate, role: IceRole) -> Self {
        let priority = Self::calculate_pair_priority(&local, &remote, role);
        Self {
            local,
            remote,
            priority,
        }
    }

    /// RFC 8445 §6.1.2.3: `2^32*MIN(G,D) + 2*MAX(G,D) + (G>D?1:0)`,
    /// G being the controlling side's candidate priority.
    #[must_use]
    pub fn calculate_pair_priority(local: &Candidate, remote: &Candidate, role: IceRole) -> u64 {
        let (g, d) = match role {
            IceRole::Controlling => (u64::from(local.priority), u64::from(remote.priority)),
            IceRole::Controlled => (u64::from(remote.priority), u64::from(local.priority)),
        };
        (g.min(d) << 32) + 2 * g.max(d) + u64::from(g > d)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ice::candidate_type::CandidateType;

    fn cand(prio: u32, port: u16) -> Candidate {
        Candidate::new(
            "f".into(),
            1,
            "udp",
            prio,
            format!("127.0.0.1:{port}").parse().unwrap(),
            CandidateType::Host,
            None,
        )
    }

    #[test]
    fn pair_priority_is_symmetric_across_roles() {
        let a = cand(100, 1);
        let b = cand(200, 2);
        let from_a = CandidatePair::calculate_pair_priority(&a, &b, IceRole::Controlling);
        let from_b = CandidatePair::calculate_pair_priority(&b, &a, IceRole::Controlled);
        assert_eq!(from_a, from_b);
        assert_eq!(from_a, (100u64 << 32) + 400);
    }
}
