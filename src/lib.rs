//! A node lifecycle, driver-linkage, and plugin-registry core for a
//! low-latency media graph engine.
//!
//! [`node`] and [`node_registry`] carry the node state machine and driver
//! reassignment; [`codec_registry`] carries the plugin-loading pattern used
//! to assemble a set of codecs. Concrete audio/video processing, a wire
//! protocol, and a graph executor are out of scope — this crate is the
//! coordination surface those would be built on top of.

pub mod codec_registry;
pub mod data_loop;
pub mod error;
pub mod listener;
pub mod node;
pub mod node_registry;
pub mod port;
pub mod properties;
pub mod quantum;
pub mod rt_graph;
mod work_queue;

pub use error::{NodeError, RegistryError};
pub use node::{Command, CommandOutcome, Info, Node, NodeId, NodeImplementation, NodeState};
pub use node_registry::NodeRegistry;
pub use properties::Properties;
