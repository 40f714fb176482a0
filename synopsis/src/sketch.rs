//! Sketch backends: compact, mergeable summaries of a column's values that
//! can answer some predicates exactly (`Some(bool)`) and the rest
//! conservatively (`None`, meaning "can't tell, don't prune").

use std::cmp::Ordering;
use std::fmt;

use pdatastructs::filters::bloomfilter::BloomFilter;
use pdatastructs::filters::Filter;

use predicate::RelOp;
use schema::Data;

/// A false positive rate tuned for catalog pruning: a 1% chance of keeping a
/// partition we didn't need to is cheap; a Bloom filter with a far lower
/// rate would cost proportionally more memory per partition.
const BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

/// A per-field or per-type summary capable of answering whether a
/// predicate can possibly be satisfied by the partition it summarizes.
pub trait Sketch: fmt::Debug + Send + Sync {
    /// Evaluates `op data` against this sketch.
    ///
    /// `Some(true)`/`Some(false)` is a definitive answer; `None` means the
    /// sketch cannot decide and the caller must assume the partition might
    /// match.
    fn lookup(&self, op: RelOp, data: &Data) -> Option<bool>;

    /// An estimate, in bytes, of this sketch's heap footprint.
    fn memory_usage(&self) -> usize;
}

/// Encodes a literal into bytes suitable for hashing into a Bloom filter.
/// Composite values (`List`, `Record`, `Map`) and `Null` have no stable
/// scalar encoding and are not sketchable this way.
fn encode_data(data: &Data) -> Option<Vec<u8>> {
    Some(match data {
        Data::Null => return None,
        Data::Bool(b) => vec![*b as u8],
        Data::Integer(i) => i.to_le_bytes().to_vec(),
        Data::Unsigned(u) => u.to_le_bytes().to_vec(),
        Data::Double(d) => d.0.to_le_bytes().to_vec(),
        Data::Duration(d) => d.as_nanos().to_le_bytes().to_vec(),
        Data::Time(t) => t.timestamp_nanos().to_le_bytes().to_vec(),
        Data::String(s) => s.as_bytes().to_vec(),
        Data::Ip(ip) => match ip {
            std::net::IpAddr::V4(v4) => v4.octets().to_vec(),
            std::net::IpAddr::V6(v6) => v6.octets().to_vec(),
        },
        Data::Port(p) => p.to_le_bytes().to_vec(),
        Data::Subnet(_) | Data::List(_) | Data::Record(_) | Data::Map(_) => return None,
    })
}

/// A Bloom filter over the literal values observed for a field, answering
/// equality membership: if the filter reports "absent", the value
/// definitely does not occur in the partition.
pub struct MembershipSketch {
    filter: BloomFilter<Vec<u8>>,
    capacity_bits: usize,
}

impl MembershipSketch {
    /// Creates an empty sketch sized for roughly `expected_elements`
    /// distinct values.
    pub fn new(expected_elements: usize) -> Self {
        let expected_elements = expected_elements.max(1);
        Self {
            filter: BloomFilter::with_properties(expected_elements, BLOOM_FALSE_POSITIVE_RATE),
            capacity_bits: expected_elements * 10,
        }
    }

    /// Records that `data` occurred in the summarized partition.
    pub fn insert(&mut self, data: &Data) {
        if let Some(bytes) = encode_data(data) {
            self.filter.insert(&bytes);
        }
    }
}

impl fmt::Debug for MembershipSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipSketch")
            .field("capacity_bits", &self.capacity_bits)
            .finish()
    }
}

impl Sketch for MembershipSketch {
    fn lookup(&self, op: RelOp, data: &Data) -> Option<bool> {
        match op {
            RelOp::Eq => {
                let bytes = encode_data(data)?;
                if self.filter.query(&bytes) {
                    None
                } else {
                    Some(false)
                }
            }
            // A Bloom filter only ever answers "possibly present" or
            // "definitely absent"; it cannot safely answer `!=`, ordering,
            // or set-membership operators.
            _ => None,
        }
    }

    fn memory_usage(&self) -> usize {
        self.capacity_bits / 8
    }
}

fn cmp_data(a: &Data, b: &Data) -> Option<Ordering> {
    match (a, b) {
        (Data::Integer(a), Data::Integer(b)) => Some(a.cmp(b)),
        (Data::Unsigned(a), Data::Unsigned(b)) => Some(a.cmp(b)),
        (Data::Double(a), Data::Double(b)) => a.partial_cmp(b),
        (Data::Duration(a), Data::Duration(b)) => Some(a.cmp(b)),
        (Data::Time(a), Data::Time(b)) => Some(a.cmp(b)),
        (Data::String(a), Data::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// The exact `[min, max]` interval observed for an orderable field.
#[derive(Clone, Debug)]
pub struct RangeSketch {
    min: Data,
    max: Data,
}

impl RangeSketch {
    /// Creates a sketch seeded with a single observed value.
    pub fn new(first: Data) -> Self {
        Self {
            min: first.clone(),
            max: first,
        }
    }

    /// Folds another observed value into the running `[min, max]`.
    pub fn update(&mut self, data: &Data) {
        if matches!(cmp_data(data, &self.min), Some(Ordering::Less)) {
            self.min = data.clone();
        }
        if matches!(cmp_data(data, &self.max), Some(Ordering::Greater)) {
            self.max = data.clone();
        }
    }

    /// The smallest value observed.
    pub fn min(&self) -> &Data {
        &self.min
    }

    /// The largest value observed.
    pub fn max(&self) -> &Data {
        &self.max
    }
}

impl Sketch for RangeSketch {
    fn lookup(&self, op: RelOp, data: &Data) -> Option<bool> {
        // `cmp_min`/`cmp_max` are `data.cmp(min)`/`data.cmp(max)`.
        let cmp_min = cmp_data(data, &self.min)?;
        let cmp_max = cmp_data(data, &self.max)?;
        match op {
            RelOp::Eq => {
                // Within `[min, max]` the value may or may not actually
                // occur; outside it, it definitely does not.
                if cmp_min == Ordering::Less || cmp_max == Ordering::Greater {
                    Some(false)
                } else {
                    None
                }
            }
            RelOp::Ne => None,
            // The partition's minimum-holding event is the best witness for
            // `<`/`<=`, and its maximum-holding event for `>`/`>=`: either
            // it satisfies the predicate, in which case the partition
            // definitely matches, or it doesn't, in which case (being the
            // extremum) no other event can either.
            RelOp::Lt => Some(cmp_min == Ordering::Greater),
            RelOp::Le => Some(cmp_min != Ordering::Less),
            RelOp::Gt => Some(cmp_max == Ordering::Less),
            RelOp::Ge => Some(cmp_max != Ordering::Greater),
            _ => None,
        }
    }

    fn memory_usage(&self) -> usize {
        std::mem::size_of::<Data>() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_sketch_rejects_absent_values() {
        let mut sketch = MembershipSketch::new(16);
        sketch.insert(&Data::String("zeek".into()));
        assert_eq!(
            sketch.lookup(RelOp::Eq, &Data::String("definitely-not-present".into())),
            Some(false)
        );
    }

    #[test]
    fn membership_sketch_cannot_refute_inequality() {
        let sketch = MembershipSketch::new(16);
        assert_eq!(sketch.lookup(RelOp::Ne, &Data::String("x".into())), None);
    }

    #[test]
    fn range_sketch_prunes_outside_interval() {
        let mut sketch = RangeSketch::new(Data::Integer(10));
        sketch.update(&Data::Integer(20));
        assert_eq!(sketch.lookup(RelOp::Eq, &Data::Integer(5)), Some(false));
        assert_eq!(sketch.lookup(RelOp::Eq, &Data::Integer(15)), None);
        assert_eq!(sketch.lookup(RelOp::Lt, &Data::Integer(10)), Some(false));
        assert_eq!(sketch.lookup(RelOp::Gt, &Data::Integer(20)), Some(false));
    }
}
