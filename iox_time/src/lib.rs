//! Time functionality.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::future_not_send,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use chrono::{DateTime, TimeZone, Utc};
use std::{
    fmt::Debug,
    ops::Sub,
    sync::Arc,
    time::Duration as StdDuration,
};

/// A monotonic wall-clock instant with nanosecond resolution.
///
/// `Time` is totally ordered and subtracting two instants yields a
/// [`StdDuration`], saturating to zero rather than panicking when the
/// right-hand side is later than the left-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Time {
    /// The earliest representable `Time`.
    pub const MIN: Self = Self(DateTime::<Utc>::MIN_UTC);

    /// The latest representable `Time`.
    pub const MAX: Self = Self(DateTime::<Utc>::MAX_UTC);

    /// Builds a `Time` from a nanosecond UNIX timestamp.
    pub fn from_timestamp_nanos(ns: i64) -> Self {
        Self(Utc.timestamp_nanos(ns))
    }

    /// Builds a `Time` from a millisecond UNIX timestamp.
    pub fn from_timestamp_millis(ms: i64) -> Self {
        Self::from_timestamp_nanos(ms.saturating_mul(1_000_000))
    }

    /// Returns the nanosecond UNIX timestamp.
    pub fn timestamp_nanos(&self) -> i64 {
        self.0.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }

    /// Returns `self + duration`, saturating at [`Time::MAX`].
    pub fn checked_add(&self, duration: StdDuration) -> Option<Self> {
        chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| self.0.checked_add_signed(d))
            .map(Self)
    }

    /// Returns `self - duration`, saturating at [`Time::MIN`].
    pub fn checked_sub(&self, duration: StdDuration) -> Option<Self> {
        chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| self.0.checked_sub_signed(d))
            .map(Self)
    }
}

impl Sub for Time {
    type Output = StdDuration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0
            .signed_duration_since(rhs.0)
            .to_std()
            .unwrap_or(StdDuration::ZERO)
    }
}

/// Anything that can hand out the current [`Time`].
///
/// Production code uses [`SystemProvider`]; tests use [`MockProvider`] so
/// that import-time windows and interval sketches are deterministic.
pub trait TimeProvider: Debug + Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] backed by the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl SystemProvider {
    /// Creates a new [`SystemProvider`].
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Utc::now())
    }
}

/// A [`TimeProvider`] that returns a fixed, externally controlled time.
#[derive(Debug)]
pub struct MockProvider {
    now: parking_lot::Mutex<Time>,
}

impl MockProvider {
    /// Creates a new [`MockProvider`] fixed at `time`.
    pub fn new(time: Time) -> Self {
        Self {
            now: parking_lot::Mutex::new(time),
        }
    }

    /// Overwrites the time returned by subsequent [`TimeProvider::now`] calls.
    pub fn set(&self, time: Time) {
        *self.now.lock() = time;
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.lock()
    }
}

/// Convenience alias for a shared, dynamically dispatched time provider.
pub type TimeProviderRef = Arc<dyn TimeProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_saturates_at_zero() {
        let earlier = Time::from_timestamp_nanos(1_000);
        let later = Time::from_timestamp_nanos(2_000);
        assert_eq!(earlier - later, StdDuration::ZERO);
        assert_eq!(later - earlier, StdDuration::from_nanos(1_000));
    }

    #[test]
    fn mock_provider_reports_fixed_time() {
        let t = Time::from_timestamp_millis(42);
        let provider = MockProvider::new(t);
        assert_eq!(provider.now(), t);
        let t2 = Time::from_timestamp_millis(43);
        provider.set(t2);
        assert_eq!(provider.now(), t2);
    }

    #[test]
    fn ordering_is_total() {
        let a = Time::from_timestamp_nanos(1);
        let b = Time::from_timestamp_nanos(2);
        assert!(a < b);
        assert!(b > a);
    }
}
