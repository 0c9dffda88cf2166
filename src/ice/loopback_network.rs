use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const FIRST_PORT: u16 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("no free port left on the loopback network")]
    PortsExhausted,
    #[error("loopback network lock poisoned")]
    Poisoned,
}

/// A payload together with the address it was sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: SocketAddr,
    pub payload: Bytes,
}

#[derive(Debug)]
struct NetworkInner {
    next_port: u16,
    bound: HashMap<SocketAddr, UnboundedSender<Datagram>>,
}

/// Process-local datagram fabric the two simulated parties share.
///
/// Every bound address owns an unbounded FIFO queue, so delivery between two
/// bound sockets is ordered and lossless. Sends to unbound addresses vanish.
#[derive(Debug)]
pub struct LoopbackNetwork {
    inner: Mutex<NetworkInner>,
}

impl LoopbackNetwork {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(NetworkInner {
                next_port: FIRST_PORT,
                bound: HashMap::new(),
            }),
        })
    }

    /// Binds a fresh socket on `127.0.0.1`.
    ///
    /// # Errors
    /// [`NetworkError::PortsExhausted`] when every port from 50000 up is taken.
    pub fn bind(self: &Arc<Self>) -> Result<VirtualSocket, NetworkError> {
        let mut inner = self.inner.lock().map_err(|_| NetworkError::Poisoned)?;
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);

        let mut port = inner.next_port;
        let addr = loop {
            let candidate = SocketAddr::new(ip, port);
            if !inner.bound.contains_key(&candidate) {
                break candidate;
            }
            port = port.checked_add(1).ok_or(NetworkError::PortsExhausted)?;
        };
        inner.next_port = port.checked_add(1).unwrap_or(FIRST_PORT);

        let (tx, rx) = mpsc::unbounded_channel();
        inner.bound.insert(addr, tx);
        Ok(VirtualSocket {
            addr,
            network: Arc::clone(self),
            rx: Some(rx),
        })
    }

    /// True if a socket is currently bound at `addr`.
    #[must_use]
    pub fn is_reachable(&self, addr: SocketAddr) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.bound.contains_key(&addr))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.inner.lock().map(|i| i.bound.len()).unwrap_or(0)
    }

    fn deliver(&self, from: SocketAddr, to: SocketAddr, payload: Bytes) -> bool {
        let Ok(inner) = self.inner.lock() else {
            return false;
        };
        match inner.bound.get(&to) {
            Some(tx) => tx.send(Datagram { from, payload }).is_ok(),
            None => false,
        }
    }

    fn unbind(&self, addr: SocketAddr) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.bound.remove(&addr);
        }
    }
}

/// A bound address on the [`LoopbackNetwork`]. Unbinds on drop.
#[derive(Debug)]
pub struct VirtualSocket {
    addr: SocketAddr,
    network: Arc<LoopbackNetwork>,
    rx: Option<UnboundedReceiver<Datagram>>,
}

impl VirtualSocket {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends to `to`; `false` if nothing is bound there.
    pub fn send_to(&self, payload: Bytes, to: SocketAddr) -> bool {
        self.network.deliver(self.addr, to, payload)
    }

    /// Hands out the inbound queue. Only the first call returns it.
    pub fn take_receiver(&mut self) -> Option<UnboundedReceiver<Datagram>> {
        self.rx.take()
    }

    /// A cloneable send half fixed to one remote address.
    #[must_use]
    pub fn link_to(&self, remote: SocketAddr) -> Link {
        self.send_half().link_to(remote)
    }

    /// A cloneable handle that sends from this socket's address.
    #[must_use]
    pub fn send_half(&self) -> SendHalf {
        SendHalf {
            local: self.addr,
            network: Arc::clone(&self.network),
        }
    }

    /// Unbinds now; later sends to this address are dropped.
    pub fn close(&self) {
        self.network.unbind(self.addr);
    }
}

impl Drop for VirtualSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sends from a fixed local address to any destination.
#[derive(Debug, Clone)]
pub struct SendHalf {
    local: SocketAddr,
    network: Arc<LoopbackNetwork>,
}

impl SendHalf {
    #[must_use]
    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn send_to(&self, payload: Bytes, to: SocketAddr) -> bool {
        self.network.deliver(self.local, to, payload)
    }

    #[must_use]
    pub fn link_to(&self, remote: SocketAddr) -> Link {
        Link {
            local: self.local,
            remote,
            network: Arc::clone(&self.network),
        }
    }
}

/// Send half of a nominated candidate pair.
#[derive(Debug, Clone)]
pub struct Link {
    local: SocketAddr,
    remote: SocketAddr,
    network: Arc<LoopbackNetwork>,
}

impl Link {
    #[must_use]
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    #[must_use]
    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn send(&self, payload: Bytes) -> bool {
        self.network.deliver(self.local, self.remote, payload)
    }
}
