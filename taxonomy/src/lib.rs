//! Taxonomies: named concepts that let a query speak in terms of meaning
//! ("the source IP") rather than schema-specific field names ("id.orig_h"
//! in one schema, "source.ip" in another), and the expression rewrite that
//! resolves a concept reference against a concrete schema.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, missing_docs, clippy::use_self)]

mod concept;
mod resolve;

pub use concept::{Concept, Concepts};
pub use resolve::{resolve, ResolveError};
