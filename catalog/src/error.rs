//! The catalog's error taxonomy.

use snafu::Snafu;
use uuid::Uuid;

/// Errors the catalog and streaming lookup surface to callers.
///
/// Every user-visible failure is one of these five kinds; the message
/// quotes the offending expression or schema where applicable so the
/// caller doesn't have to re-derive it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The query expression failed to normalize, resolve, or validate.
    #[snafu(display("invalid expression: {source}"))]
    InvalidArgument {
        /// The underlying normalization failure.
        source: predicate::NormalizeError,
    },

    /// A concept reference could not be resolved against a schema.
    #[snafu(display("could not resolve taxonomy for schema {schema}: {source}"))]
    TaxonomyResolution {
        /// The schema being resolved against.
        schema: String,
        /// The underlying resolution failure.
        source: taxonomy::ResolveError,
    },

    /// `start` was called with one or more synopses whose format version
    /// predates the minimum this catalog supports.
    #[snafu(display(
        "{} synopses report an unsupported version (minimum supported is {min_supported}): {uuids:?}",
        uuids.len(),
    ))]
    UnsupportedVersion {
        /// The offending partitions.
        uuids: Vec<Uuid>,
        /// The minimum version this catalog was configured to accept.
        min_supported: u32,
    },

    /// A request named a partition the catalog does not know about.
    #[snafu(display("no such partition: {uuid}"))]
    LookupError {
        /// The requested partition.
        uuid: Uuid,
    },

    /// A second `get` was issued against a streaming lookup while the
    /// first was still outstanding.
    #[snafu(display("a get() request is already pending on this streaming lookup"))]
    LogicError,

    /// An internal invariant was violated, e.g. an `Expr::None` survived
    /// into the evaluator. This can only happen if normalization was
    /// skipped or is itself buggy.
    #[snafu(display("internal invariant violated: {detail}"))]
    InternalInvariant {
        /// What was expected to be impossible.
        detail: String,
    },

    /// The catalog (or streaming lookup) actor's mailbox has already shut
    /// down; the handle is no longer usable.
    #[snafu(display("catalog actor is no longer running"))]
    Actor,
}

/// The crate's result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
