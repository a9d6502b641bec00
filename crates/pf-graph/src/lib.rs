//! pf-graph: hydraulic topology for plantflow.
//!
//! Provides:
//! - Headers (shared-pressure junctions) and links (one branch between two headers)
//! - Incremental builder with validation
//! - Compact header -> link adjacency for the network solver
//!
//! # Example
//!
//! ```
//! use pf_graph::TopologyBuilder;
//!
//! let mut builder = TopologyBuilder::new();
//! let supply = builder.add_header("Supply");
//! let ret = builder.add_header("Return");
//! builder.add_link("Primary pump", ret, supply);
//! builder.add_link("AHU", supply, ret);
//! let topo = builder.build().unwrap();
//!
//! assert_eq!(topo.headers().len(), 2);
//! assert_eq!(topo.links().len(), 2);
//! ```

pub mod builder;
pub mod error;
pub mod topology;
pub(crate) mod validate;

pub use builder::TopologyBuilder;
pub use error::{GraphError, GraphResult};
pub use topology::{Header, Incidence, Link, LinkEnd, Topology};
