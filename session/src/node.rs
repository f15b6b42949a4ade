//! The mesh engine: link registry, state machine, and flood fan-out.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use driftmesh_crypto::{open, seal};
use driftmesh_identity::{AddressHash, Directory, KeyStore};
use driftmesh_routing::{Delivered, Router, RouterVerdict};
use driftmesh_wire::{Packet, PacketType};

use crate::config::NodeConfig;
use crate::error::SendError;
use crate::events::{NodeEvent, NodeState};
use crate::link::{LinkHandle, LinkId, LinkRole};

/// One mesh node: owns the active link set, the lifecycle state machine,
/// and the fan-out of every outbound packet to every link.
///
/// Explicitly constructed and explicitly started/stopped; hosts hold it in
/// an `Arc` and hand clones to the transport and the application layer. All
/// callbacks are safe to invoke from any number of concurrent transport
/// worker contexts.
pub struct MeshNode {
    cfg: NodeConfig,
    keys: Arc<dyn KeyStore>,
    directory: Arc<dyn Directory>,
    router: Router,
    links: DashMap<LinkId, LinkHandle>,
    state: Mutex<NodeState>,
    remote: Mutex<Option<AddressHash>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    events_tx: mpsc::UnboundedSender<NodeEvent>,
}

impl MeshNode {
    /// Create a node around the host's key store and contact directory.
    ///
    /// Returns the node and the application-facing event stream.
    pub fn new(
        cfg: NodeConfig,
        keys: Arc<dyn KeyStore>,
        directory: Arc<dyn Directory>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<NodeEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let router = Router::new(cfg.router_config(), keys.address_hash().0);
        let node = Arc::new(Self {
            cfg,
            keys,
            directory,
            router,
            links: DashMap::new(),
            state: Mutex::new(NodeState::Idle),
            remote: Mutex::new(None),
            sweeper: Mutex::new(None),
            events_tx,
        });
        (node, events_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        *relock(&self.state)
    }

    /// Begin accepting inbound links and discovering peers.
    ///
    /// No-op unless the node is idle. Must be called within a tokio
    /// runtime; the periodic record sweeper is spawned here.
    pub fn start(self: &Arc<Self>) {
        {
            let mut state = relock(&self.state);
            if *state != NodeState::Idle {
                warn!(state = %*state, "start ignored, node already running");
                return;
            }
            self.set_state_locked(&mut state, NodeState::Listening);
        }
        info!(local = %self.keys.address_hash(), "mesh node started");

        let weak = Arc::downgrade(self);
        let period = self.cfg.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(node) => node.router.sweep(),
                    None => break,
                }
            }
        });
        if let Some(previous) = relock(&self.sweeper).replace(handle) {
            previous.abort();
        }
    }

    /// Close every link and return to idle.
    ///
    /// Safe to call concurrently with in-flight sends and receives; links
    /// observe closure through their dropped frame channels.
    pub fn stop(&self) {
        if let Some(sweeper) = relock(&self.sweeper).take() {
            sweeper.abort();
        }

        let mut state = relock(&self.state);
        if *state == NodeState::Idle {
            return;
        }
        self.links.clear();
        self.set_state_locked(&mut state, NodeState::Idle);
        drop(state);
        info!("mesh node stopped");
    }

    /// Note an outbound connection attempt to `peer`.
    ///
    /// The transport performs the actual dial and reports the outcome via
    /// [`MeshNode::on_link_up`] or [`MeshNode::on_connect_failed`].
    pub fn connect(&self, peer: &str) {
        let mut state = relock(&self.state);
        if *state == NodeState::Idle {
            warn!(peer, "connect ignored, node not started");
            return;
        }
        debug!(peer, "outbound connection attempt");
        self.set_state_locked(&mut state, NodeState::Connecting);
    }

    /// The transport's outbound connection attempt failed.
    pub fn on_connect_failed(&self) {
        let mut state = relock(&self.state);
        if *state == NodeState::Idle {
            return;
        }
        let next = if self.links.is_empty() {
            NodeState::Listening
        } else {
            NodeState::Connected
        };
        self.set_state_locked(&mut state, next);
    }

    /// Register a freshly connected link and hand back its outbound frame
    /// stream for the transport to drain.
    ///
    /// If the node is idle the stream comes back already closed and the
    /// link is not registered.
    pub fn on_link_up(&self, id: LinkId, role: LinkRole) -> mpsc::Receiver<Bytes> {
        let (frame_tx, frame_rx) = mpsc::channel(self.cfg.link_send_buffer);

        let mut state = relock(&self.state);
        if *state == NodeState::Idle {
            warn!(%id, "link refused, node not started");
            return frame_rx;
        }
        self.links.insert(id, LinkHandle { role, frame_tx });
        info!(%id, %role, links = self.links.len(), "link up");
        self.set_state_locked(&mut state, NodeState::Connected);
        frame_rx
    }

    /// A link closed; drop it from the active set.
    pub fn on_link_down(&self, id: LinkId) {
        let mut state = relock(&self.state);
        if self.links.remove(&id).is_some() {
            info!(%id, links = self.links.len(), "link down");
        }
        if *state != NodeState::Idle && self.links.is_empty() {
            self.set_state_locked(&mut state, NodeState::Listening);
        }
    }

    /// Raw bytes arrived from a peer link.
    ///
    /// Feeds the router; relays are flooded onward, completed messages are
    /// opened and surfaced, and a successful delivery is acknowledged back
    /// into the mesh.
    pub fn on_bytes_received(&self, link: LinkId, bytes: &[u8]) {
        match self.router.handle_inbound(bytes) {
            Some(RouterVerdict::Relay(packet)) => {
                debug!(%link, message_id = packet.message_id, "flooding relay");
                self.flood(&packet);
            }
            Some(RouterVerdict::Deliver(delivered)) => self.deliver(delivered),
            None => {}
        }
    }

    /// Choose the peer that plain [`MeshNode::send`] addresses.
    pub fn set_remote(&self, peer: Option<AddressHash>) {
        *relock(&self.remote) = peer;
    }

    /// Send to the peer chosen via [`MeshNode::set_remote`].
    pub fn send(&self, plaintext: &str) -> Result<(), SendError> {
        let dest = (*relock(&self.remote)).unwrap_or_else(AddressHash::zero);
        self.send_to(&dest, plaintext)
    }

    /// Seal, chunk, and flood one message to `dest`.
    ///
    /// The only surfaced failure is a destination with no known key; link
    /// trouble during fan-out degrades per link, never the send.
    pub fn send_to(&self, dest: &AddressHash, plaintext: &str) -> Result<(), SendError> {
        let recipient = self
            .directory
            .resolve_public_key(dest)
            .ok_or(SendError::NoKey)?;
        let envelope = seal(plaintext, &recipient, self.keys.private_key())?;
        let packets = self
            .router
            .prepare(&envelope, dest.0, self.keys.address_hash().0);

        info!(peer = %dest, chunks = packets.len(), "sending message");
        for packet in &packets {
            self.flood(packet);
        }
        Ok(())
    }

    fn deliver(&self, delivered: Delivered) {
        let sender = AddressHash::from(delivered.src_hash);
        match delivered.kind {
            PacketType::Ack => {
                debug!(peer = %sender, "delivery acknowledged");
                self.emit(NodeEvent::Delivered { peer: sender });
            }
            PacketType::Data | PacketType::Relay => {
                let opened = open(
                    &delivered.payload,
                    &sender,
                    self.keys.private_key(),
                    self.directory.as_ref(),
                    self.cfg.unknown_sender_policy,
                );
                match opened {
                    Ok(message) => {
                        info!(peer = %sender, authenticated = message.authenticated, "message received");
                        self.emit(NodeEvent::MessageReceived {
                            plaintext: message.plaintext,
                            sender,
                            authenticated: message.authenticated,
                        });
                        let ack = self
                            .router
                            .prepare_ack(delivered.src_hash, self.keys.address_hash().0);
                        self.flood(&ack);
                    }
                    Err(err) => {
                        debug!(peer = %sender, error = %err, "discarding unopenable message");
                    }
                }
            }
        }
    }

    /// Write one packet to every active link of both roles.
    ///
    /// A link whose transport stopped draining loses this packet; a link
    /// whose channel closed is evicted. Neither interrupts the fan-out.
    fn flood(&self, packet: &Packet) {
        let frame = packet.encode();
        let mut dead = Vec::new();

        for entry in self.links.iter() {
            match entry.value().frame_tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(link = %entry.key(), "link backlogged, dropping frame for it");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*entry.key());
                }
            }
        }

        if !dead.is_empty() {
            let mut state = relock(&self.state);
            for id in dead {
                if self.links.remove(&id).is_some() {
                    info!(%id, "link closed by transport, evicting");
                }
            }
            if *state != NodeState::Idle && self.links.is_empty() {
                self.set_state_locked(&mut state, NodeState::Listening);
            }
        }
    }

    fn set_state_locked(&self, state: &mut MutexGuard<'_, NodeState>, next: NodeState) {
        if **state != next {
            **state = next;
            debug!(state = %next, "state changed");
            self.emit(NodeEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: NodeEvent) {
        // The application dropping its receiver must not disturb routing.
        let _ = self.events_tx.send(event);
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
