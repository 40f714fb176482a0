//! Partition synopses: the probabilistic and exact sketches a catalog
//! consults to prune partitions before scanning them.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, missing_docs, clippy::use_self)]

mod partition;
mod sketch;

pub use partition::{PartitionSynopsis, CURRENT_VERSION};
pub use sketch::{MembershipSketch, RangeSketch, Sketch};
