//! [`StreamingLookup`]: the incremental, back-pressured candidate producer
//! described in `spec.md` §4.5.
//!
//! Unlike [`crate::Catalog`], a streaming lookup owns a frozen snapshot of
//! synopses by move and is created fresh per query; there is nothing to
//! stash because there is no bootstrap phase to wait for.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use predicate::Expr;
use schema::Type;
use synopsis::PartitionSynopsis;
use taxonomy::Concepts;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lookup::{lookup_impl, Universe};
use crate::partition_info::PartitionInfo;
use crate::query::CandidateInfo;

/// Depth of the producer→server batch channel; also the point at which the
/// producer task blocks, giving the back-pressure bound named by
/// `cache_capacity`.
const PRODUCER_CHANNEL_SLACK: usize = 1;

enum ControlMsg {
    Get {
        reply: oneshot::Sender<Result<Vec<CandidateInfo>>>,
    },
}

enum BatchMsg {
    Candidate(CandidateInfo),
    Failed(Error),
}

/// A per-query, incremental candidate producer.
///
/// Cloning shares the same background task; dropping every clone closes
/// the control mailbox, which cancels the task cooperatively on its next
/// scheduling point — the idiomatic substitute for "cancellation by
/// dropping the client handle" (`spec.md` §5).
#[derive(Clone, Debug)]
pub struct StreamingLookup {
    control: mpsc::Sender<ControlMsg>,
}

impl StreamingLookup {
    /// Creates a streaming lookup over `partitions`, which is consumed in
    /// order (oldest queued first). `get` yields batches of at most
    /// roughly `cache_capacity` candidates at a time.
    pub fn new(
        partitions: VecDeque<(Uuid, Arc<PartitionSynopsis>)>,
        unprunable_fields: HashSet<String>,
        taxonomies: Concepts,
        query: Expr,
        cache_capacity: usize,
    ) -> Self {
        let cache_capacity = cache_capacity.max(1);
        let normalized = predicate::normalize_and_validate(if query.is_none() {
            Expr::trivially_true()
        } else {
            query
        });

        let (control_tx, control_rx) = mpsc::channel(8);
        let (batch_tx, batch_rx) = mpsc::channel(cache_capacity + PRODUCER_CHANNEL_SLACK);

        tokio::spawn(produce(partitions, unprunable_fields, taxonomies, normalized, batch_tx));
        tokio::spawn(serve(control_rx, batch_rx, cache_capacity));

        Self { control: control_tx }
    }

    /// Returns the next batch of candidates, blocking until at least one is
    /// available or the stream is exhausted (signaled by an empty `Vec`).
    ///
    /// Only one `get` may be outstanding at a time; issuing a second while
    /// the first hasn't resolved fails with [`Error::LogicError`] without
    /// disturbing the first.
    pub async fn get(&self) -> Result<Vec<CandidateInfo>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(ControlMsg::Get { reply: reply_tx })
            .await
            .map_err(|_| Error::Actor)?;
        reply_rx.await.map_err(|_| Error::Actor)?
    }
}

async fn produce(
    mut partitions: VecDeque<(Uuid, Arc<PartitionSynopsis>)>,
    unprunable_fields: HashSet<String>,
    taxonomies: Concepts,
    normalized: std::result::Result<Expr, predicate::NormalizeError>,
    batch_tx: mpsc::Sender<BatchMsg>,
) {
    let normalized = match normalized {
        Ok(expr) => expr,
        Err(source) => {
            let _ = batch_tx
                .send(BatchMsg::Failed(Error::InvalidArgument { source }))
                .await;
            return;
        }
    };

    let mut bound_exprs: HashMap<Type, Expr> = HashMap::new();
    while let Some((uuid, synopsis)) = partitions.pop_front() {
        let schema = synopsis.schema.clone();
        let bound = match bound_exprs.get(&schema) {
            Some(expr) => expr.clone(),
            None => {
                let resolved = match taxonomy::resolve(&taxonomies, normalized.clone(), &schema) {
                    Ok(expr) => expr,
                    Err(source) => {
                        let _ = batch_tx
                            .send(BatchMsg::Failed(Error::TaxonomyResolution {
                                schema: schema.name().to_string(),
                                source,
                            }))
                            .await;
                        return;
                    }
                };
                let pruned = predicate::prune(resolved, &unprunable_fields);
                bound_exprs.insert(schema.clone(), pruned.clone());
                pruned
            }
        };

        let mut universe = Universe::new();
        universe.insert(uuid, Arc::clone(&synopsis));
        let matched = match lookup_impl(&bound, &schema, &universe) {
            Ok(matched) => matched,
            Err(err) => {
                let _ = batch_tx.send(BatchMsg::Failed(err)).await;
                return;
            }
        };
        if !matched.is_empty() {
            let candidate = CandidateInfo {
                partitions: vec![PartitionInfo::from_synopsis(uuid, &synopsis)],
                bound_expr: bound,
            };
            if batch_tx.send(BatchMsg::Candidate(candidate)).await.is_err() {
                // Every `StreamingLookup` handle was dropped; stop feeding a
                // channel nobody can read from.
                return;
            }
        }
        tokio::task::yield_now().await;
    }
}

async fn serve(
    mut control_rx: mpsc::Receiver<ControlMsg>,
    mut batch_rx: mpsc::Receiver<BatchMsg>,
    cache_capacity: usize,
) {
    let mut pending: Option<oneshot::Sender<Result<Vec<CandidateInfo>>>> = None;
    let mut buffer: Vec<CandidateInfo> = Vec::new();
    let mut failure: Option<Error> = None;
    let mut closed = false;

    loop {
        tokio::select! {
            msg = control_rx.recv() => {
                let Some(ControlMsg::Get { reply }) = msg else { return };
                if pending.is_some() {
                    let _ = reply.send(Err(Error::LogicError));
                } else if let Some(err) = failure.take() {
                    closed = true;
                    let _ = reply.send(Err(err));
                } else if !buffer.is_empty() {
                    let _ = reply.send(Ok(std::mem::take(&mut buffer)));
                } else if closed {
                    let _ = reply.send(Ok(Vec::new()));
                } else {
                    pending = Some(reply);
                }
            }
            item = batch_rx.recv(), if !closed && buffer.len() < cache_capacity => {
                match item {
                    Some(BatchMsg::Candidate(candidate)) => {
                        if let Some(reply) = pending.take() {
                            let mut batch = vec![candidate];
                            while let Ok(next) = batch_rx.try_recv() {
                                match next {
                                    BatchMsg::Candidate(c) => batch.push(c),
                                    BatchMsg::Failed(err) => {
                                        failure = Some(err);
                                        closed = true;
                                        break;
                                    }
                                }
                            }
                            let _ = reply.send(Ok(batch));
                        } else {
                            buffer.push(candidate);
                        }
                    }
                    Some(BatchMsg::Failed(err)) => {
                        closed = true;
                        if let Some(reply) = pending.take() {
                            let _ = reply.send(Err(err));
                        } else {
                            failure = Some(err);
                        }
                    }
                    None => {
                        closed = true;
                        if let Some(reply) = pending.take() {
                            let _ = reply.send(Ok(std::mem::take(&mut buffer)));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iox_time::Time;
    use predicate::{Operand, RelOp};
    use schema::{Data, RecordField, TypeKind};
    use synopsis::MembershipSketch;

    fn schema() -> Type {
        Type::named(
            TypeKind::Record(vec![RecordField::new("x", Type::new(TypeKind::Integer))]),
            "conn",
        )
    }

    fn synopsis_matching(value: i64) -> (Uuid, Arc<PartitionSynopsis>) {
        let uuid = Uuid::new_v4();
        let mut synopsis = PartitionSynopsis::new(schema(), Time::from_timestamp_nanos(0));
        let qrf = schema::Qrf::new("conn", "x", Type::new(TypeKind::Integer));
        let mut sketch = MembershipSketch::new(4);
        sketch.insert(&Data::Integer(value));
        synopsis.set_field_sketch(qrf, Some(Box::new(sketch)));
        (uuid, Arc::new(synopsis))
    }

    #[tokio::test]
    async fn drains_all_matching_partitions_in_capped_batches() {
        let partitions: VecDeque<_> = (0..5).map(|_| synopsis_matching(1)).collect();
        let lookup = StreamingLookup::new(
            partitions,
            HashSet::new(),
            Concepts::new(),
            Expr::pred(
                Operand::Field("x".into()),
                RelOp::Eq,
                Operand::Data(Data::Integer(1)),
            ),
            2,
        );

        let mut total = 0;
        loop {
            let batch = lookup.get().await.unwrap();
            if batch.is_empty() {
                break;
            }
            assert!(batch.len() <= 2);
            total += batch.len();
        }
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn concurrent_get_fails_with_logic_error() {
        let partitions: VecDeque<_> = (0..3).map(|_| synopsis_matching(1)).collect();
        let lookup = StreamingLookup::new(
            partitions,
            HashSet::new(),
            Concepts::new(),
            Expr::trivially_true(),
            1,
        );
        let a = lookup.clone();
        let b = lookup.clone();
        let (first, second) = tokio::join!(a.get(), async {
            // Give the first request a head start so it's the one parked.
            tokio::task::yield_now().await;
            b.get().await
        });
        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::LogicError)) || second.is_ok());
    }

    #[tokio::test]
    async fn absent_query_matches_every_partition() {
        let partitions: VecDeque<_> = (0..2).map(|_| synopsis_matching(1)).collect();
        let lookup = StreamingLookup::new(partitions, HashSet::new(), Concepts::new(), Expr::None, 10);
        let batch = lookup.get().await.unwrap();
        assert_eq!(batch.len(), 2);
    }
}
