//! The process-wide partition synopsis catalog: a single actor that owns
//! every [`synopsis::PartitionSynopsis`] the local process has loaded, and
//! answers candidate-partition queries against them.
//!
//! The actor shape mirrors `ingester`'s `IngesterData` / lifecycle-handle
//! split: a plain, synchronous state object ([`state::CatalogState`]) does
//! all the real work, and a small `tokio::sync::mpsc` mailbox loop is the
//! only thing that touches async machinery. Callers get a cheap
//! [`Clone`]able [`Catalog`] handle; the state itself never leaves its
//! owning task.

mod error;
mod lookup;
mod partition_info;
mod query;
mod state;
mod streaming;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use observability_deps::tracing::warn;
use predicate::Expr;
use synopsis::PartitionSynopsis;
use taxonomy::Concepts;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

pub use error::{Error, Result};
pub use lookup::Universe;
pub use partition_info::PartitionInfo;
pub use query::{CandidateInfo, CatalogLookupResult, Query};
pub use streaming::StreamingLookup;

use state::CatalogState;

type Synopses = Vec<(Uuid, Arc<PartitionSynopsis>)>;

/// The mailbox depth for the catalog actor. Callers don't push a
/// meaningful volume of concurrent requests — this just keeps a burst from
/// blocking on `send`.
const MAILBOX_CAPACITY: usize = 256;

enum Msg {
    Start {
        synopses: Synopses,
        reply: oneshot::Sender<Result<()>>,
    },
    Merge {
        synopses: Synopses,
        reply: oneshot::Sender<()>,
    },
    Erase {
        uuid: Uuid,
        reply: oneshot::Sender<Result<()>>,
    },
    Replace {
        old: Vec<Uuid>,
        new: Synopses,
        reply: oneshot::Sender<()>,
    },
    GetAll {
        reply: oneshot::Sender<Synopses>,
    },
    GetFiltered {
        expr: Expr,
        reply: oneshot::Sender<Result<Synopses>>,
    },
    GetByUuid {
        uuid: Uuid,
        reply: oneshot::Sender<Result<PartitionInfo>>,
    },
    Candidates {
        query: Query,
        reply: oneshot::Sender<Result<CatalogLookupResult>>,
    },
    Memusage {
        reply: oneshot::Sender<usize>,
    },
    PruningContext {
        reply: oneshot::Sender<(HashSet<String>, Concepts)>,
    },
}

/// A handle to the catalog's background actor.
///
/// Cloning is cheap (it clones an `mpsc::Sender`); every clone talks to the
/// same state. The catalog starts in a not-ready state: every request other
/// than [`Catalog::start`] is stashed in arrival order and replayed once
/// `start` succeeds, so callers racing bootstrap against their first query
/// don't need to coordinate by hand.
#[derive(Clone, Debug)]
pub struct Catalog {
    tx: mpsc::Sender<Msg>,
}

impl Catalog {
    /// Spawns the catalog actor and returns a handle to it.
    pub fn new(taxonomies: Concepts, min_supported_partition_version: u32) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let actor = CatalogActor {
            state: CatalogState::new(taxonomies, min_supported_partition_version),
            ready: false,
            stash: VecDeque::new(),
            rx,
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// Bootstraps the catalog from its initial synopses. Must be called
    /// exactly once; every other request issued before it succeeds is
    /// queued, not rejected.
    pub async fn start(&self, synopses: Synopses) -> Result<()> {
        self.call(|reply| Msg::Start { synopses, reply }).await?
    }

    /// Adds or overwrites synopses.
    pub async fn merge(&self, synopses: Synopses) -> Result<()> {
        self.call(|reply| Msg::Merge { synopses, reply }).await
    }

    /// Removes a partition by uuid.
    pub async fn erase(&self, uuid: Uuid) -> Result<()> {
        self.call(|reply| Msg::Erase { uuid, reply }).await?
    }

    /// Atomically erases `old` and inserts `new`.
    pub async fn replace(&self, old: Vec<Uuid>, new: Synopses) -> Result<()> {
        self.call(|reply| Msg::Replace { old, new, reply }).await
    }

    /// Every synopsis currently held.
    pub async fn get_all(&self) -> Result<Synopses> {
        self.call(|reply| Msg::GetAll { reply }).await
    }

    /// Every synopsis matching `expr`, across all schemas.
    pub async fn get_filtered(&self, expr: Expr) -> Result<Synopses> {
        self.call(|reply| Msg::GetFiltered { expr, reply }).await?
    }

    /// A single partition's info by uuid.
    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<PartitionInfo> {
        self.call(|reply| Msg::GetByUuid { uuid, reply }).await?
    }

    /// The central candidate-lookup operation.
    pub async fn candidates(&self, query: Query) -> Result<CatalogLookupResult> {
        self.call(|reply| Msg::Candidates { query, reply }).await?
    }

    /// An estimate, in bytes, of the catalog's total heap footprint.
    pub async fn memusage(&self) -> Result<usize> {
        self.call(|reply| Msg::Memusage { reply }).await
    }

    /// A snapshot of the catalog-wide pruning context (`unprunable_fields`,
    /// `taxonomies`) a [`StreamingLookup`] needs to resolve and prune its
    /// own per-schema expressions independently of the catalog's lifetime.
    async fn snapshot_pruning_context(&self) -> Result<(HashSet<String>, Concepts)> {
        self.call(|reply| Msg::PruningContext { reply }).await
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Msg) -> Result<T> {
        let (reply, recv) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| Error::Actor)?;
        recv.await.map_err(|_| Error::Actor)
    }
}

struct CatalogActor {
    state: CatalogState,
    ready: bool,
    stash: VecDeque<Msg>,
    rx: mpsc::Receiver<Msg>,
}

impl CatalogActor {
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            self.handle(msg);
        }
    }

    fn handle(&mut self, msg: Msg) {
        if !self.ready && !matches!(msg, Msg::Start { .. }) {
            self.stash.push_back(msg);
            return;
        }
        self.dispatch(msg);
    }

    fn dispatch(&mut self, msg: Msg) {
        match msg {
            Msg::Start { synopses, reply } => {
                let result = self.state.start(synopses);
                if result.is_ok() {
                    self.ready = true;
                }
                let _ = reply.send(result);
                if self.ready {
                    self.drain_stash();
                }
            }
            Msg::Merge { synopses, reply } => {
                self.state.merge(synopses);
                let _ = reply.send(());
            }
            Msg::Erase { uuid, reply } => {
                let _ = reply.send(self.state.erase(uuid));
            }
            Msg::Replace { old, new, reply } => {
                self.state.replace(old, new);
                let _ = reply.send(());
            }
            Msg::GetAll { reply } => {
                let _ = reply.send(self.state.get_all());
            }
            Msg::GetFiltered { expr, reply } => {
                let _ = reply.send(self.state.get_filtered(expr));
            }
            Msg::GetByUuid { uuid, reply } => {
                let _ = reply.send(self.state.get_by_uuid(uuid));
            }
            Msg::Candidates { query, reply } => {
                let _ = reply.send(self.state.candidates(query));
            }
            Msg::Memusage { reply } => {
                let _ = reply.send(self.state.memusage());
            }
            Msg::PruningContext { reply } => {
                let _ = reply.send((
                    self.state.unprunable_fields().clone(),
                    self.state.taxonomies().clone(),
                ));
            }
        }
    }

    /// Replays every message that arrived before `start` succeeded, in the
    /// order it arrived. A message stashed during this drain (there can't
    /// be one — the actor processes messages one at a time — is
    /// impossible, but `dispatch` is re-entrant-safe regardless since
    /// `ready` is already `true` by the time this runs.
    fn drain_stash(&mut self) {
        while let Some(msg) = self.stash.pop_front() {
            debug_assert!(self.ready);
            self.dispatch(msg);
        }
        if !self.stash.is_empty() {
            warn!("catalog stash non-empty after drain, this is a bug");
        }
    }
}

/// Builds a [`StreamingLookup`] over a snapshot of `catalog`'s partitions
/// for `schema` at the moment this is called.
///
/// This is a free function rather than a [`Catalog`] method because a
/// streaming lookup owns its partitions by move, independent of the
/// catalog's own lifetime; the catalog is only consulted once, up front,
/// to take the snapshot.
pub async fn stream_candidates(
    catalog: &Catalog,
    schema_filter: impl Fn(&schema::Type) -> bool,
    query: Expr,
    cache_capacity: usize,
) -> Result<StreamingLookup> {
    let all = catalog.get_all().await?;
    let partitions: VecDeque<_> = all
        .into_iter()
        .filter(|(_, synopsis)| schema_filter(&synopsis.schema))
        .collect();
    // `unprunable_fields`/`taxonomies` are catalog-wide, not per-schema; a
    // dedicated request keeps this function from needing a `Msg` variant
    // that leaks `CatalogState` internals through the handle.
    let (unprunable_fields, taxonomies) = catalog.snapshot_pruning_context().await?;
    Ok(StreamingLookup::new(
        partitions,
        unprunable_fields,
        taxonomies,
        query,
        cache_capacity,
    ))
}
