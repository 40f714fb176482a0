//! The event value and type model shared across the catalog: [`Data`] is
//! the runtime value representation, [`Type`] is the schema-level type
//! representation, and [`Qrf`] identifies a leaf field within a schema.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod data;
mod qrf;
mod suffix;
mod types;

pub use data::{Data, Subnet};
pub use qrf::Qrf;
pub use suffix::suffix_matches;
pub use types::{congruent, RecordField, Type, TypeKind};
