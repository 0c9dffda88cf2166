use std::{collections::VecDeque, net::SocketAddr, sync::Arc};

use rand::{Rng, rngs::OsRng};

use crate::ice::{
    candidate::{Candidate, CandidateParseError},
    candidate_pair::{CandidatePair, IceRole},
    gathering_service::gather_host_candidate,
    ice_candidate::IceCandidate,
    loopback_network::{LoopbackNetwork, NetworkError, VirtualSocket},
};

const UFRAG_LEN: usize = 8;
const PWD_LEN: usize = 24;

/// What happened to a remote candidate handed to [`IceAgent::apply_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCandidateOutcome {
    Applied(Candidate),
    Duplicate,
    Unparseable(CandidateParseError),
}

/// Candidate bookkeeping for one endpoint: local gathering, the buffer of
/// early remote candidates, applied remote candidates and the nominated pair.
#[derive(Debug)]
pub struct IceAgent {
    role: IceRole,
    ufrag: String,
    pwd: String,
    local_candidates: Vec<Candidate>,
    socket: Option<VirtualSocket>,
    remote_candidates: Vec<Candidate>,
    pending_remote: VecDeque<IceCandidate>,
    failed: Vec<SocketAddr>,
    nominated: Option<CandidatePair>,
}

impl IceAgent {
    #[must_use]
    pub fn new(role: IceRole) -> Self {
        Self {
            role,
            ufrag: gen_token(UFRAG_LEN),
            pwd: gen_token(PWD_LEN),
            local_candidates: Vec::new(),
            socket: None,
            remote_candidates: Vec::new(),
            pending_remote: VecDeque::new(),
            failed: Vec::new(),
            nominated: None,
        }
    }

    #[must_use]
    pub fn role(&self) -> IceRole {
        self.role
    }

    pub fn set_role(&mut self, role: IceRole) {
        self.role = role;
    }

    #[must_use]
    pub fn local_credentials(&self) -> (&str, &str) {
        (&self.ufrag, &self.pwd)
    }

    #[must_use]
    pub fn local_candidates(&self) -> &[Candidate] {
        &self.local_candidates
    }

    #[must_use]
    pub fn remote_candidates(&self) -> &[Candidate] {
        &self.remote_candidates
    }

    #[must_use]
    pub fn pending_remote(&self) -> usize {
        self.pending_remote.len()
    }

    #[must_use]
    pub fn nominated_pair(&self) -> Option<&CandidatePair> {
        self.nominated.as_ref()
    }

    /// Binds the endpoint's socket and returns the new host candidate.
    /// `None` if gathering already ran.
    ///
    /// # Errors
    /// Propagates bind failures from the fabric.
    pub fn gather(
        &mut self,
        network: &Arc<LoopbackNetwork>,
        component: u8,
    ) -> Result<Option<Candidate>, NetworkError> {
        if self.socket.is_some() {
            return Ok(None);
        }
        let (socket, candidate) = gather_host_candidate(network, component)?;
        self.socket = Some(socket);
        self.local_candidates.push(candidate.clone());
        Ok(Some(candidate))
    }

    pub fn socket_mut(&mut self) -> Option<&mut VirtualSocket> {
        self.socket.as_mut()
    }

    /// Queues a candidate that arrived before any remote description.
    pub fn buffer_remote(&mut self, candidate: IceCandidate) {
        self.pending_remote.push_back(candidate);
    }

    /// Drains the buffer in arrival order.
    pub fn take_pending(&mut self) -> Vec<IceCandidate> {
        self.pending_remote.drain(..).collect()
    }

    /// Records a remote candidate. Parse failures and duplicates are reported,
    /// not raised: they just never take part in pairing.
    pub fn apply_remote(&mut self, candidate: &IceCandidate) -> RemoteCandidateOutcome {
        let parsed = match candidate.parse() {
            Ok(c) => c,
            Err(e) => return RemoteCandidateOutcome::Unparseable(e),
        };
        if self
            .remote_candidates
            .iter()
            .any(|c| c.address == parsed.address && c.component == parsed.component)
        {
            return RemoteCandidateOutcome::Duplicate;
        }
        self.remote_candidates.push(parsed.clone());
        RemoteCandidateOutcome::Applied(parsed)
    }

    /// Candidate pairs still worth checking, best first. Equal priorities
    /// keep the earliest remote candidate. Empty once a pair is nominated.
    #[must_use]
    pub fn candidate_pairs(&self) -> Vec<CandidatePair> {
        if self.nominated.is_some() {
            return Vec::new();
        }
        let mut pairs = Vec::new();
        for remote in &self.remote_candidates {
            if self.failed.contains(&remote.address) {
                continue;
            }
            for local in &self.local_candidates {
                if local.component != remote.component
                    || local.transport != remote.transport
                    || local.address.is_ipv4() != remote.address.is_ipv4()
                {
                    continue;
                }
                pairs.push(CandidatePair::new(local.clone(), remote.clone(), self.role));
            }
        }
        // Stable: ties stay in arrival order.
        pairs.sort_by(|x, y| y.priority.cmp(&x.priority));
        pairs
    }

    /// Excludes a remote address whose check went unanswered.
    pub fn mark_failed(&mut self, remote: SocketAddr) {
        if !self.failed.contains(&remote) {
            self.failed.push(remote);
        }
    }

    /// Records the pair whose check succeeded. Ignored if one is already set.
    pub fn nominate(&mut self, pair: CandidatePair) -> Option<&CandidatePair> {
        if self.nominated.is_some() {
            return None;
        }
        self.nominated = Some(pair);
        self.nominated.as_ref()
    }

    /// Drops the socket and forgets every candidate.
    pub fn close(&mut self) {
        if let Some(sock) = self.socket.take() {
            sock.close();
        }
        self.local_candidates.clear();
        self.remote_candidates.clear();
        self.pending_remote.clear();
        self.failed.clear();
        self.nominated = None;
    }
}

fn gen_token(len: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| ALPHABET[OsRng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn line(port: u16) -> IceCandidate {
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        IceCandidate::from_candidate(&Candidate::host(addr, "udp", 1), Some("0".into()), 0)
    }

    #[test]
    fn credentials_have_ice_lengths() {
        let agent = IceAgent::new(IceRole::Controlling);
        let (ufrag, pwd) = agent.local_credentials();
        assert_eq!(ufrag.len(), 8);
        assert_eq!(pwd.len(), 24);
    }

    #[test]
    fn buffer_drains_in_arrival_order() {
        let mut agent = IceAgent::new(IceRole::Controlled);
        agent.buffer_remote(line(3));
        agent.buffer_remote(line(1));
        agent.buffer_remote(line(2));
        assert_eq!(agent.pending_remote(), 3);

        let drained = agent.take_pending();
        assert_eq!(drained, vec![line(3), line(1), line(2)]);
        assert_eq!(agent.pending_remote(), 0);
    }

    #[test]
    fn garbage_and_duplicates_are_reported_not_applied() {
        let mut agent = IceAgent::new(IceRole::Controlled);
        assert!(matches!(
            agent.apply_remote(&IceCandidate::new("candidate:nonsense", None, 0)),
            RemoteCandidateOutcome::Unparseable(_)
        ));
        assert!(matches!(agent.apply_remote(&line(7)), RemoteCandidateOutcome::Applied(_)));
        assert_eq!(agent.apply_remote(&line(7)), RemoteCandidateOutcome::Duplicate);
        assert_eq!(agent.remote_candidates().len(), 1);
    }

    #[test]
    fn pairs_are_ordered_and_skip_failed_remotes() {
        let net = LoopbackNetwork::new();
        let mut a = IceAgent::new(IceRole::Controlling);
        a.gather(&net, 1).unwrap();

        let low = IceCandidate::new("candidate:1 1 udp 100 127.0.0.1 7001 typ host", None, 0);
        let high = IceCandidate::new("candidate:2 1 udp 4294967295 127.0.0.1 7002 typ host", None, 0);
        let other_component =
            IceCandidate::new("candidate:3 2 udp 2130706431 127.0.0.1 7003 typ host", None, 0);
        a.apply_remote(&low);
        a.apply_remote(&high);
        a.apply_remote(&other_component);

        let pairs = a.candidate_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].remote.address.port(), 7002);
        assert_eq!(pairs[1].remote.address.port(), 7001);

        a.mark_failed(pairs[0].remote.address);
        let pairs = a.candidate_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].remote.address.port(), 7001);

        let chosen = pairs[0].clone();
        assert!(a.nominate(chosen.clone()).is_some());
        assert_eq!(a.nominated_pair(), Some(&chosen));
        assert!(a.candidate_pairs().is_empty());
        assert!(a.nominate(chosen).is_none());
    }

    #[test]
    fn close_forgets_every_candidate() {
        let net = LoopbackNetwork::new();
        let mut a = IceAgent::new(IceRole::Controlled);
        a.gather(&net, 1).unwrap();
        a.apply_remote(&line(7));
        a.buffer_remote(line(8));
        a.mark_failed("127.0.0.1:7".parse().unwrap());

        a.close();
        assert!(a.local_candidates().is_empty());
        assert!(a.remote_candidates().is_empty());
        assert_eq!(a.pending_remote(), 0);
        assert!(a.nominated_pair().is_none());
        assert_eq!(net.bound_count(), 0);
    }

    #[test]
    fn gather_runs_once() {
        let net = LoopbackNetwork::new();
        let mut a = IceAgent::new(IceRole::Controlling);
        assert!(a.gather(&net, 1).unwrap().is_some());
        assert!(a.gather(&net, 1).unwrap().is_none());
        assert_eq!(a.local_candidates().len(), 1);
        a.close();
        assert_eq!(net.bound_count(), 0);
    }
}
