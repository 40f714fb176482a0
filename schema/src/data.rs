//! The runtime value model: a tagged union covering everything an event
//! field can hold.

use indexmap::IndexMap;
use iox_time::Time;
use ordered_float::OrderedFloat;
use std::{net::IpAddr, time::Duration};

/// An IP subnet, e.g. `10.0.0.0/8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subnet {
    /// The network address.
    pub network: IpAddr,
    /// The prefix length, in bits.
    pub prefix: u8,
}

impl Subnet {
    /// Creates a new subnet from a network address and prefix length.
    pub fn new(network: IpAddr, prefix: u8) -> Self {
        Self { network, prefix }
    }

    /// Returns whether `addr` falls within this subnet.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = if self.prefix == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.prefix.min(32))
                };
                (u32::from(net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = if self.prefix == 0 {
                    0
                } else {
                    u128::MAX << (128 - self.prefix.min(128))
                };
                (u128::from(net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

/// A tagged runtime value.
///
/// `Record` is insertion-ordered (backed by [`IndexMap`]) so that leaf
/// iteration order matches the declaring schema's field order. `Map` is
/// represented as an association list rather than a hash map because keys
/// may themselves contain [`OrderedFloat`] values whose hashing semantics
/// we would rather not have to reason about.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A floating point number.
    Double(OrderedFloat<f64>),
    /// A duration, i.e. a difference between two [`Time`]s.
    Duration(Duration),
    /// A point in time.
    Time(Time),
    /// A UTF-8 string.
    String(String),
    /// An IP address.
    Ip(IpAddr),
    /// An IP subnet.
    Subnet(Subnet),
    /// A transport-layer port number.
    Port(u16),
    /// An ordered list of values.
    List(Vec<Data>),
    /// An insertion-ordered mapping from field name to value.
    Record(IndexMap<String, Data>),
    /// An association list of key/value pairs.
    Map(Vec<(Data, Data)>),
}

impl Data {
    /// Returns the string if this is a [`Data::String`], else `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Data::Bool`], else `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the time if this is a [`Data::Time`], else `None`.
    pub fn as_time(&self) -> Option<Time> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Data::List`], else `None`.
    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Self::List(xs) => Some(xs),
            _ => None,
        }
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Data {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Time> for Data {
    fn from(t: Time) -> Self {
        Self::Time(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn subnet_contains_checks_prefix() {
        let subnet = Subnet::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 8);
        assert!(subnet.contains(&IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
        assert!(!subnet.contains(&IpAddr::V4(Ipv4Addr::new(11, 0, 0, 1))));
    }

    #[test]
    fn subnet_zero_prefix_matches_everything() {
        let subnet = Subnet::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 0);
        assert!(subnet.contains(&IpAddr::V4(Ipv4Addr::new(255, 1, 2, 3))));
    }
}
