use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    endpoint::{ConnectionEndpoint, EndpointId},
    ice::IceCandidate,
    log::LogSink,
    relay::{candidate_relay::CandidateRelay, relay_error::RelayError},
    sink_debug, sink_trace,
};

struct Direction {
    tx: Mutex<Option<UnboundedSender<IceCandidate>>>,
    delivered: Arc<AtomicUsize>,
}

/// Direct in-process delivery: one FIFO queue and one forwarding task per
/// direction, so candidates reach the peer in the order they were produced.
pub struct InMemoryRelay {
    to_a: Direction,
    to_b: Direction,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    logger: Arc<dyn LogSink>,
}

impl InMemoryRelay {
    /// Spawns the forwarding tasks. Must run inside a tokio runtime.
    pub fn new(
        a: Arc<ConnectionEndpoint>,
        b: Arc<ConnectionEndpoint>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        let (to_a, task_a) = Self::direction(a, Arc::clone(&logger));
        let (to_b, task_b) = Self::direction(b, Arc::clone(&logger));
        Self {
            to_a,
            to_b,
            tasks: Mutex::new(vec![task_a, task_b]),
            logger,
        }
    }

    fn direction(
        target: Arc<ConnectionEndpoint>,
        logger: Arc<dyn LogSink>,
    ) -> (Direction, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let delivered = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(forward(rx, target, Arc::clone(&delivered), logger));
        (
            Direction {
                tx: Mutex::new(Some(tx)),
                delivered,
            },
            task,
        )
    }

    /// Candidates handed to `to` so far.
    #[must_use]
    pub fn delivered_to(&self, to: EndpointId) -> usize {
        match to {
            EndpointId::A => self.to_a.delivered.load(Ordering::SeqCst),
            EndpointId::B => self.to_b.delivered.load(Ordering::SeqCst),
        }
    }
}

impl CandidateRelay for InMemoryRelay {
    fn relay(&self, from: EndpointId, candidate: IceCandidate) -> Result<(), RelayError> {
        let to = from.peer();
        let direction = match to {
            EndpointId::A => &self.to_a,
            EndpointId::B => &self.to_b,
        };
        sink_trace!(self.logger, "[RELAY] {} -> {}: {}", from, to, candidate.candidate);
        let Ok(guard) = direction.tx.lock() else {
            return Err(RelayError::Closed(to));
        };
        match guard.as_ref() {
            Some(tx) => tx.send(candidate).map_err(|_| RelayError::Closed(to)),
            None => Err(RelayError::Closed(to)),
        }
    }

    fn close(&self) {
        for direction in [&self.to_a, &self.to_b] {
            if let Ok(mut tx) = direction.tx.lock() {
                tx.take();
            }
        }
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        sink_debug!(self.logger, "[RELAY] closed");
    }
}

impl Drop for InMemoryRelay {
    fn drop(&mut self) {
        self.close();
    }
}

async fn forward(
    mut rx: UnboundedReceiver<IceCandidate>,
    target: Arc<ConnectionEndpoint>,
    delivered: Arc<AtomicUsize>,
    logger: Arc<dyn LogSink>,
) {
    while let Some(candidate) = rx.recv().await {
        target.add_candidate(candidate).await;
        delivered.fetch_add(1, Ordering::SeqCst);
    }
    sink_trace!(logger, "[RELAY] queue towards {} drained", target.id());
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{ice::LoopbackNetwork, log::NoopLogSink};

    #[tokio::test]
    async fn forwards_in_order_and_refuses_after_close() {
        let net = LoopbackNetwork::new();
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let (a, _ra) = ConnectionEndpoint::new(EndpointId::A, Arc::clone(&net), 1, Arc::clone(&logger));
        let (b, _rb) = ConnectionEndpoint::new(EndpointId::B, net, 1, Arc::clone(&logger));
        let b = Arc::new(b);
        let relay = InMemoryRelay::new(Arc::new(a), Arc::clone(&b), logger);

        let lines: Vec<IceCandidate> = (1..=3)
            .map(|p| {
                IceCandidate::new(
                    format!("candidate:{p} 1 udp {p} 127.0.0.1 {p} typ host"),
                    None,
                    0,
                )
            })
            .collect();
        for c in &lines {
            relay.relay(EndpointId::A, c.clone()).unwrap();
        }
        while relay.delivered_to(EndpointId::B) < 3 {
            tokio::task::yield_now().await;
        }
        // B has no remote description yet, so all three are buffered.
        assert_eq!(b.pending_candidates().await, 3);
        assert_eq!(relay.delivered_to(EndpointId::A), 0);

        relay.close();
        assert_eq!(
            relay.relay(EndpointId::A, lines[0].clone()),
            Err(RelayError::Closed(EndpointId::B))
        );
    }
}
