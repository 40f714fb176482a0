//! A partition's synopsis: the summary the catalog consults to decide
//! whether a partition could possibly satisfy a query, without reading the
//! partition itself.

use std::collections::HashMap;

use iox_time::Time;
use schema::{Qrf, Type};

use crate::sketch::Sketch;

/// A partition's synopsis: row count, import time bounds, and the sketches
/// built over its fields and (post-pruning) generalized types.
pub struct PartitionSynopsis {
    /// The schema this partition's events conform to.
    pub schema: Type,
    /// The number of events in the partition.
    pub events: u64,
    /// The earliest import time among the partition's events.
    pub min_import_time: Time,
    /// The latest import time among the partition's events.
    pub max_import_time: Time,
    /// A format version, bumped whenever the sketch encoding changes
    /// incompatibly.
    pub version: u32,
    /// Per-field sketches, keyed by qualified record field. `None` records
    /// that a field was observed but deliberately not sketched (e.g. it was
    /// always null, or its type has no sketch backend).
    field_synopses: HashMap<Qrf, Option<Box<dyn Sketch>>>,
    /// Sketches keyed by a generalized (nameless) leaf type, consulted once
    /// pruning has rewritten a field predicate into a `TypeExtractor`.
    type_synopses: HashMap<Type, Box<dyn Sketch>>,
}

impl std::fmt::Debug for PartitionSynopsis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionSynopsis")
            .field("schema", &self.schema.name())
            .field("events", &self.events)
            .field("min_import_time", &self.min_import_time)
            .field("max_import_time", &self.max_import_time)
            .field("version", &self.version)
            .field("field_synopses", &self.field_synopses.len())
            .field("type_synopses", &self.type_synopses.len())
            .finish()
    }
}

/// The current synopsis format version.
pub const CURRENT_VERSION: u32 = 1;

impl PartitionSynopsis {
    /// Creates an empty synopsis for `schema`, imported at `import_time`.
    pub fn new(schema: Type, import_time: Time) -> Self {
        Self {
            schema,
            events: 0,
            min_import_time: import_time,
            max_import_time: import_time,
            version: CURRENT_VERSION,
            field_synopses: HashMap::new(),
            type_synopses: HashMap::new(),
        }
    }

    /// Registers a sketch for a concrete field.
    pub fn set_field_sketch(&mut self, qrf: Qrf, sketch: Option<Box<dyn Sketch>>) {
        self.field_synopses.insert(qrf, sketch);
    }

    /// Registers a sketch for a generalized leaf type.
    pub fn set_type_sketch(&mut self, ty: Type, sketch: Box<dyn Sketch>) {
        self.type_synopses.insert(ty, sketch);
    }

    /// Looks up the sketch registered for `qrf`, if any.
    pub fn field_sketch(&self, qrf: &Qrf) -> Option<&dyn Sketch> {
        self.field_synopses.get(qrf)?.as_deref()
    }

    /// Looks up the sketch registered for the generalized type `ty`.
    pub fn type_sketch(&self, ty: &Type) -> Option<&dyn Sketch> {
        self.type_synopses.get(ty).map(AsRef::as_ref)
    }

    /// Iterates every field this synopsis knows about, alongside its
    /// sketch slot: `Some(sketch)` for a dedicated sketch, `None` for the
    /// sentinel meaning "known field, no dedicated sketch — fall back to
    /// the type synopsis for its normalized leaf type".
    pub fn fields(&self) -> impl Iterator<Item = (&Qrf, Option<&dyn Sketch>)> + '_ {
        self.field_synopses
            .iter()
            .map(|(qrf, sketch)| (qrf, sketch.as_deref()))
    }

    /// An estimate, in bytes, of this synopsis's heap footprint, summing
    /// every registered sketch.
    pub fn memory_usage(&self) -> usize {
        let fields: usize = self
            .field_synopses
            .values()
            .filter_map(|s| s.as_ref())
            .map(|s| s.memory_usage())
            .sum();
        let types: usize = self.type_synopses.values().map(|s| s.memory_usage()).sum();
        fields + types + std::mem::size_of::<Self>()
    }

    /// Folds another event's import time into this synopsis's bounds and
    /// increments the event count. Sketch updates happen through the
    /// sketches themselves (via [`PartitionSynopsis::field_sketch_mut`]).
    pub fn record_event(&mut self, import_time: Time) {
        self.events += 1;
        if import_time < self.min_import_time {
            self.min_import_time = import_time;
        }
        if import_time > self.max_import_time {
            self.max_import_time = import_time;
        }
    }

    /// Mutable access to a field's sketch slot, for incremental building.
    pub fn field_sketch_mut(&mut self, qrf: &Qrf) -> Option<&mut Option<Box<dyn Sketch>>> {
        self.field_synopses.get_mut(qrf)
    }

    /// Drops internal over-allocation once a partition's synopsis is done
    /// being built and will only be read from now on.
    pub fn shrink(&mut self) {
        self.field_synopses.shrink_to_fit();
        self.type_synopses.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::RangeSketch;
    use predicate::RelOp;
    use schema::{Data, TypeKind};

    fn time(nanos: i64) -> Time {
        Time::from_timestamp_nanos(nanos)
    }

    #[test]
    fn record_event_widens_import_time_bounds() {
        let mut synopsis = PartitionSynopsis::new(Type::new(TypeKind::Record(vec![])), time(100));
        synopsis.record_event(time(50));
        synopsis.record_event(time(200));
        assert_eq!(synopsis.min_import_time, time(50));
        assert_eq!(synopsis.max_import_time, time(200));
        assert_eq!(synopsis.events, 2);
    }

    #[test]
    fn missing_sketch_is_always_a_candidate() {
        let synopsis = PartitionSynopsis::new(Type::new(TypeKind::Record(vec![])), time(0));
        let qrf = Qrf::new("conn", "id.orig_h", Type::new(TypeKind::Ip));
        assert!(synopsis.field_sketch(&qrf).is_none());
    }

    #[test]
    fn registered_sketch_can_exclude() {
        let mut synopsis = PartitionSynopsis::new(Type::new(TypeKind::Record(vec![])), time(0));
        let qrf = Qrf::new("conn", "duration", Type::new(TypeKind::Integer));
        synopsis.set_field_sketch(
            qrf.clone(),
            Some(Box::new(RangeSketch::new(Data::Integer(10)))),
        );
        let sketch = synopsis.field_sketch(&qrf).expect("sketch was registered");
        assert_eq!(sketch.lookup(RelOp::Eq, &Data::Integer(999)), Some(false));
    }
}
