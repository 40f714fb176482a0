//! The query expression model shared by taxonomy resolution and catalog
//! lookup: predicates over schema fields, the connectives that combine
//! them, and the rewrites (`normalize_and_validate`, `prune`) that keep an
//! expression in the canonical form a catalog lookup expects.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

mod compat;
mod expr;
mod hoist;
mod normalize;
mod operand;
mod prune;
mod relop;

pub use compat::{compatible, evaluate};
pub use expr::Expr;
pub use hoist::hoist;
pub use normalize::{normalize_and_validate, NormalizeError};
pub use operand::{MetaKind, Operand, Pred};
pub use prune::prune;
pub use relop::RelOp;

/// The crate's result alias.
pub type Result<T, E = NormalizeError> = std::result::Result<T, E>;
