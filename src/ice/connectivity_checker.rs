use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::oneshot;

use crate::{
    ice::{
        binding_message::{BindingKind, BindingMessage, TransactionId},
        loopback_network::{Datagram, SendHalf},
    },
    log::LogSink,
    sink_debug, sink_trace,
};

/// How long a check waits for the peer before the pair counts as failed.
pub const CHECK_TIMEOUT: Duration = Duration::from_millis(50);

/// Sends binding requests and matches the responses that come back through
/// the endpoint's receive loop. Also answers the peer's requests.
///
/// Clones share the in-flight transaction table.
#[derive(Clone)]
pub struct ConnectivityChecker {
    local_ufrag: String,
    in_flight: Arc<Mutex<HashMap<TransactionId, oneshot::Sender<SocketAddr>>>>,
    timeout: Duration,
    logger: Arc<dyn LogSink>,
}

impl ConnectivityChecker {
    pub fn new(local_ufrag: &str, logger: Arc<dyn LogSink>) -> Self {
        Self {
            local_ufrag: local_ufrag.to_owned(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout: CHECK_TIMEOUT,
            logger,
        }
    }

    /// Sends one binding request from `sender` to `remote` and waits for the
    /// answer. Succeeds only if the response comes back from `remote` itself.
    pub async fn check(&self, sender: &SendHalf, remote: SocketAddr, remote_ufrag: &str) -> bool {
        let request = BindingMessage::request(remote_ufrag, &self.local_ufrag);
        let (tx, rx) = oneshot::channel();
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.insert(request.transaction_id, tx);
        } else {
            return false;
        }

        let ok = if sender.send_to(request.encode(), remote) {
            matches!(
                tokio::time::timeout(self.timeout, rx).await,
                Ok(Ok(from)) if from == remote
            )
        } else {
            false
        };

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&request.transaction_id);
        }
        sink_trace!(
            self.logger,
            "[ICE] check {} -> {}: {}",
            sender.local(),
            remote,
            if ok { "succeeded" } else { "failed" }
        );
        ok
    }

    /// Handles an inbound check. Returns `false` if `dgram` is not one, so
    /// the caller can route it elsewhere.
    pub fn handle(&self, dgram: &Datagram, sender: &SendHalf) -> bool {
        if !BindingMessage::is_binding(&dgram.payload) {
            return false;
        }
        let Some(msg) = BindingMessage::decode(&dgram.payload) else {
            sink_debug!(self.logger, "[ICE] malformed check from {}", dgram.from);
            return true;
        };
        match msg.kind {
            BindingKind::Request if msg.target_ufrag() == self.local_ufrag => {
                sender.send_to(msg.response().encode(), dgram.from);
            }
            BindingKind::Request => {
                sink_debug!(
                    self.logger,
                    "[ICE] ignoring check for ufrag '{}' from {}",
                    msg.target_ufrag(),
                    dgram.from
                );
            }
            BindingKind::Response => {
                let waiter = self
                    .in_flight
                    .lock()
                    .ok()
                    .and_then(|mut m| m.remove(&msg.transaction_id));
                if let Some(waiter) = waiter {
                    let _ = waiter.send(dgram.from);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        ice::{LoopbackNetwork, loopback_network::VirtualSocket},
        log::NoopLogSink,
    };

    fn answering(checker: ConnectivityChecker, mut socket: VirtualSocket) {
        let mut rx = socket.take_receiver().unwrap();
        let sender = socket.send_half();
        tokio::spawn(async move {
            let _socket = socket;
            while let Some(d) = rx.recv().await {
                checker.handle(&d, &sender);
            }
        });
    }

    #[tokio::test]
    async fn peer_that_answers_passes() {
        let net = LoopbackNetwork::new();
        let mut a = net.bind().unwrap();
        let b = net.bind().unwrap();
        let b_addr = b.local_addr();

        let a_checker = ConnectivityChecker::new("aaaa", Arc::new(NoopLogSink));
        let b_checker = ConnectivityChecker::new("bbbb", Arc::new(NoopLogSink));
        answering(b_checker, b);

        let a_rx = a.take_receiver().unwrap();
        let a_sender = a.send_half();
        let responder = a_checker.clone();
        let loop_sender = a_sender.clone();
        tokio::spawn(async move {
            let mut rx = a_rx;
            while let Some(d) = rx.recv().await {
                responder.handle(&d, &loop_sender);
            }
        });

        assert!(a_checker.check(&a_sender, b_addr, "bbbb").await);
        // Wrong ufrag: the peer stays silent.
        assert!(!a_checker.check(&a_sender, b_addr, "zzzz").await);
    }

    #[tokio::test]
    async fn silent_or_unbound_address_fails() {
        let net = LoopbackNetwork::new();
        let a = net.bind().unwrap();
        let silent = net.bind().unwrap();
        let checker = ConnectivityChecker::new("aaaa", Arc::new(NoopLogSink));

        assert!(!checker.check(&a.send_half(), silent.local_addr(), "x").await);
        assert!(
            !checker
                .check(&a.send_half(), "127.0.0.1:9".parse().unwrap(), "x")
                .await
        );
    }
}
