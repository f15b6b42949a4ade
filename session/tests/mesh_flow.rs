//! End-to-end mesh scenarios: two peers bridged by a relay node.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use once_cell::sync::Lazy;
use tokio::sync::mpsc;
use tokio::time::timeout;

use driftmesh_identity::{AddressHash, KeyStore, MemoryDirectory, MemoryIdentity};
use driftmesh_session::{LinkId, LinkRole, MeshNode, NodeConfig, NodeEvent};
use driftmesh_wire::{Packet, PacketType};

static ALICE: Lazy<Arc<MemoryIdentity>> =
    Lazy::new(|| Arc::new(MemoryIdentity::generate().unwrap()));
static BOB: Lazy<Arc<MemoryIdentity>> =
    Lazy::new(|| Arc::new(MemoryIdentity::generate().unwrap()));
static CAROL: Lazy<Arc<MemoryIdentity>> =
    Lazy::new(|| Arc::new(MemoryIdentity::generate().unwrap()));

/// Pump frames leaving one node into the peer's receive callback.
fn bridge(mut frames: mpsc::Receiver<Bytes>, peer: Arc<MeshNode>, peer_link: LinkId) {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            peer.on_bytes_received(peer_link, &frame);
        }
    });
}

/// Like [`bridge`], but records every decoded frame crossing the wire.
fn tapped_bridge(
    mut frames: mpsc::Receiver<Bytes>,
    peer: Arc<MeshNode>,
    peer_link: LinkId,
    tap: Arc<Mutex<Vec<Packet>>>,
) {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Ok(packet) = Packet::decode(&frame) {
                tap.lock().unwrap().push(packet);
            }
            peer.on_bytes_received(peer_link, &frame);
        }
    });
}

async fn next_message(
    events: &mut mpsc::UnboundedReceiver<NodeEvent>,
) -> (String, AddressHash, bool) {
    loop {
        match events.recv().await.expect("event stream closed") {
            NodeEvent::MessageReceived {
                plaintext,
                sender,
                authenticated,
            } => return (plaintext, sender, authenticated),
            _ => continue,
        }
    }
}

async fn next_delivery(events: &mut mpsc::UnboundedReceiver<NodeEvent>) -> AddressHash {
    loop {
        match events.recv().await.expect("event stream closed") {
            NodeEvent::Delivered { peer } => return peer,
            _ => continue,
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_relay_delivery_and_ack() {
    // Topology: ALICE <-> CAROL <-> BOB. Carol only relays; she holds
    // neither endpoint's private key.
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(ALICE.public_key());
    directory.insert(BOB.public_key());

    let (alice, mut alice_events) =
        MeshNode::new(NodeConfig::default(), ALICE.clone(), directory.clone());
    let (bob, mut bob_events) =
        MeshNode::new(NodeConfig::default(), BOB.clone(), directory.clone());
    let (carol, mut carol_events) =
        MeshNode::new(NodeConfig::default(), CAROL.clone(), directory.clone());

    alice.start();
    bob.start();
    carol.start();

    let alice_out = alice.on_link_up(LinkId(1), LinkRole::Client);
    let carol_out_a = carol.on_link_up(LinkId(1), LinkRole::Server);
    let carol_out_b = carol.on_link_up(LinkId(2), LinkRole::Client);
    let bob_out = bob.on_link_up(LinkId(1), LinkRole::Server);

    let tap = Arc::new(Mutex::new(Vec::new()));
    bridge(alice_out, carol.clone(), LinkId(1));
    bridge(carol_out_a, alice.clone(), LinkId(1));
    tapped_bridge(carol_out_b, bob.clone(), LinkId(1), tap.clone());
    bridge(bob_out, carol.clone(), LinkId(2));

    alice.send_to(&BOB.address_hash(), "hello across the mesh").unwrap();

    let (plaintext, sender, authenticated) =
        timeout(Duration::from_secs(30), next_message(&mut bob_events))
            .await
            .expect("message never reached bob");
    assert_eq!(plaintext, "hello across the mesh");
    assert_eq!(sender, ALICE.address_hash());
    assert!(authenticated);

    // Bob's acknowledgment floods back through Carol.
    let peer = timeout(Duration::from_secs(30), next_delivery(&mut alice_events))
        .await
        .expect("ack never reached alice");
    assert_eq!(peer, BOB.address_hash());

    // Carol relayed but never decrypted: no message event, and every data
    // packet she forwarded kept its sealed payload with TTL down by one.
    while let Ok(event) = carol_events.try_recv() {
        assert!(
            !matches!(event, NodeEvent::MessageReceived { .. }),
            "relay node must not read the message"
        );
    }
    let forwarded = tap.lock().unwrap();
    let data: Vec<&Packet> = forwarded
        .iter()
        .filter(|p| p.kind == PacketType::Data && p.src_hash == ALICE.address_hash().0)
        .collect();
    assert!(!data.is_empty());
    for packet in data {
        assert_eq!(packet.ttl, 9, "relay must decrement ttl exactly once");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_direct_two_node_exchange() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(ALICE.public_key());
    directory.insert(BOB.public_key());

    let (alice, mut alice_events) =
        MeshNode::new(NodeConfig::default(), ALICE.clone(), directory.clone());
    let (bob, mut bob_events) =
        MeshNode::new(NodeConfig::default(), BOB.clone(), directory.clone());
    alice.start();
    bob.start();

    let alice_out = alice.on_link_up(LinkId(7), LinkRole::Client);
    let bob_out = bob.on_link_up(LinkId(3), LinkRole::Server);
    bridge(alice_out, bob.clone(), LinkId(3));
    bridge(bob_out, alice.clone(), LinkId(7));

    // Long enough to need several chunks.
    let long_message = "mesh ".repeat(300);
    alice.set_remote(Some(BOB.address_hash()));
    alice.send(&long_message).unwrap();

    let (plaintext, sender, _) =
        timeout(Duration::from_secs(30), next_message(&mut bob_events))
            .await
            .expect("message never reached bob");
    assert_eq!(plaintext, long_message);
    assert_eq!(sender, ALICE.address_hash());

    let peer = timeout(Duration::from_secs(30), next_delivery(&mut alice_events))
        .await
        .expect("ack never reached alice");
    assert_eq!(peer, BOB.address_hash());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_closes_transport_channels() {
    let directory = Arc::new(MemoryDirectory::new());
    let (node, _events) = MeshNode::new(NodeConfig::default(), ALICE.clone(), directory);
    node.start();

    let mut frames = node.on_link_up(LinkId(1), LinkRole::Server);
    node.stop();

    // The transport observes closure and tears the link down.
    assert!(frames.recv().await.is_none());
}
