//! Link lifecycle, node state machine, and packet fan-out for driftmesh.
//!
//! [`MeshNode`] is the engine the host application constructs and drives:
//! the external link transport reports connections and raw bytes into it,
//! and it emits [`NodeEvent`]s for the application layer. Outbound messages
//! are sealed, chunked, and flooded to every active link of both roles; the
//! node keeps no routing table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use driftmesh_identity::{MemoryDirectory, MemoryIdentity};
//! use driftmesh_session::{LinkId, LinkRole, MeshNode, NodeConfig, NodeEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let keys = Arc::new(MemoryIdentity::generate()?);
//! let directory = Arc::new(MemoryDirectory::new());
//! let (node, mut events) = MeshNode::new(NodeConfig::default(), keys, directory);
//!
//! node.start();
//!
//! // The transport hands the engine a new link and drains its frames.
//! let mut frames = node.on_link_up(LinkId(1), LinkRole::Server);
//! tokio::spawn(async move {
//!     while let Some(frame) = frames.recv().await {
//!         // write frame to the radio
//!         let _ = frame;
//!     }
//! });
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         NodeEvent::MessageReceived { plaintext, sender, .. } => {
//!             println!("{}: {}", sender, plaintext);
//!         }
//!         NodeEvent::StateChanged(state) => println!("now {}", state),
//!         NodeEvent::Delivered { peer } => println!("{} got it", peer),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod node;

pub use config::NodeConfig;
pub use error::SendError;
pub use events::{NodeEvent, NodeState};
pub use link::{LinkId, LinkRole};
pub use node::MeshNode;
