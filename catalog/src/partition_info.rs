//! [`PartitionInfo`]: the immutable descriptor the catalog hands back to
//! callers instead of the synopsis itself.

use std::cmp::Ordering;

use iox_time::Time;
use schema::Type;
use synopsis::PartitionSynopsis;
use uuid::Uuid;

/// A cheap-to-copy projection of a [`PartitionSynopsis`], ordered and
/// compared by `uuid` alone — two `PartitionInfo`s for the same partition
/// are equal even if one is stale with respect to event count or import
/// time, since the uuid is what identifies the partition.
#[derive(Clone, Debug)]
pub struct PartitionInfo {
    /// The partition's identifier.
    pub uuid: Uuid,
    /// The number of events in the partition at the time this info was
    /// produced.
    pub events: u64,
    /// The partition's latest import time.
    pub max_import_time: Time,
    /// The partition's schema.
    pub schema: Type,
    /// The synopsis format version.
    pub version: u32,
}

impl PartitionInfo {
    /// Projects a synopsis into its info.
    pub fn from_synopsis(uuid: Uuid, synopsis: &PartitionSynopsis) -> Self {
        Self {
            uuid,
            events: synopsis.events,
            max_import_time: synopsis.max_import_time,
            schema: synopsis.schema.clone(),
            version: synopsis.version,
        }
    }
}

impl PartialEq for PartitionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for PartitionInfo {}

impl PartialOrd for PartitionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartitionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl PartialEq<Uuid> for PartitionInfo {
    fn eq(&self, other: &Uuid) -> bool {
        &self.uuid == other
    }
}

impl PartialOrd<Uuid> for PartitionInfo {
    fn partial_cmp(&self, other: &Uuid) -> Option<Ordering> {
        Some(self.uuid.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::TypeKind;

    fn synopsis() -> PartitionSynopsis {
        PartitionSynopsis::new(
            Type::new(TypeKind::Record(vec![])),
            Time::from_timestamp_nanos(0),
        )
    }

    #[test]
    fn equality_is_by_uuid_only() {
        let uuid = Uuid::new_v4();
        let mut a = PartitionInfo::from_synopsis(uuid, &synopsis());
        let b = PartitionInfo::from_synopsis(uuid, &synopsis());
        a.events = 42;
        assert_eq!(a, b);
    }

    #[test]
    fn compares_against_bare_uuid() {
        let uuid = Uuid::new_v4();
        let info = PartitionInfo::from_synopsis(uuid, &synopsis());
        assert_eq!(info, uuid);
    }
}
