//! Per-source daily request budgets.
//!
//! Each source has a `{limit, used, reset_at}` record. Resets are lazy: when a
//! source is touched after its reset time, `used` goes back to 0 and the reset
//! time moves to now + 24h. Nothing runs in the background.
//!
//! Check-and-increment is a single critical section per source. Callers take a
//! [`Reservation`] before calling an adapter and commit it only when the call
//! produced tracks; dropping an uncommitted reservation gives the slot back.
//! Concurrent callers therefore can't push `used` past `limit`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::domain::SourceKind;
use crate::clock::Clock;

/// One day in milliseconds.
pub const RESET_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// A daily request limit.
///
/// In TOML this is either a number or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    fn allows(self, count: u64) -> bool {
        match self {
            Limit::Limited(max) => count < max,
            Limit::Unlimited => true,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Limited(n) => write!(f, "{n}"),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(u64),
    Word(String),
}

impl TryFrom<LimitRepr> for Limit {
    type Error = String;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Count(n) => Ok(Limit::Limited(n)),
            LimitRepr::Word(w) => match w.to_lowercase().as_str() {
                "unlimited" | "infinity" | "inf" => Ok(Limit::Unlimited),
                other => Err(format!("invalid limit '{other}', expected a number or \"unlimited\"")),
            },
        }
    }
}

impl From<Limit> for LimitRepr {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Limited(n) => LimitRepr::Count(n),
            Limit::Unlimited => LimitRepr::Word("unlimited".to_string()),
        }
    }
}

#[derive(Debug)]
struct BudgetState {
    limit: Limit,
    used: u64,
    /// Reservations handed out but not yet committed or dropped
    in_flight: u64,
    reset_at_ms: i64,
}

impl BudgetState {
    fn roll_over(&mut self, now_ms: i64) {
        if now_ms > self.reset_at_ms {
            self.used = 0;
            self.reset_at_ms = now_ms + RESET_INTERVAL_MS;
        }
    }

    fn has_room(&self) -> bool {
        self.limit.allows(self.used + self.in_flight)
    }
}

/// Read-only view of one source's budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub used: u64,
    pub limit: Limit,
    /// `None` when unlimited
    pub remaining: Option<u64>,
    pub reset_time: DateTime<Utc>,
    pub available: bool,
}

/// Tracks daily usage for every source.
pub struct RateBudgetTracker {
    budgets: BTreeMap<SourceKind, Mutex<BudgetState>>,
    clock: Arc<dyn Clock>,
}

impl RateBudgetTracker {
    /// Create a tracker with the given limits. Sources without an entry are
    /// unlimited. First reset is 24h from now.
    pub fn new(limits: &BTreeMap<SourceKind, Limit>, clock: Arc<dyn Clock>) -> Self {
        let reset_at_ms = clock.now_millis() + RESET_INTERVAL_MS;
        let budgets = SourceKind::ALL
            .iter()
            .map(|&kind| {
                let limit = limits.get(&kind).copied().unwrap_or(Limit::Unlimited);
                (
                    kind,
                    Mutex::new(BudgetState {
                        limit,
                        used: 0,
                        in_flight: 0,
                        reset_at_ms,
                    }),
                )
            })
            .collect();

        Self { budgets, clock }
    }

    fn state(&self, source: SourceKind) -> &Mutex<BudgetState> {
        // Every kind is inserted in `new`
        &self.budgets[&source]
    }

    /// Whether a call to `source` would currently be allowed.
    pub fn is_available(&self, source: SourceKind) -> bool {
        let mut state = self.state(source).lock();
        state.roll_over(self.clock.now_millis());
        state.has_room()
    }

    /// Atomically check availability and hold a slot for one call.
    ///
    /// Returns `None` when the source is exhausted.
    pub fn try_reserve(self: &Arc<Self>, source: SourceKind) -> Option<Reservation> {
        let mut state = self.state(source).lock();
        state.roll_over(self.clock.now_millis());
        if !state.has_room() {
            return None;
        }
        state.in_flight += 1;

        Some(Reservation {
            tracker: Arc::clone(self),
            source,
            settled: false,
        })
    }

    /// Count one successful call without a prior reservation.
    ///
    /// Capped at the limit, so `used` never exceeds it.
    pub fn record_use(&self, source: SourceKind) {
        let mut state = self.state(source).lock();
        state.roll_over(self.clock.now_millis());
        if state.limit.allows(state.used) {
            state.used += 1;
        }
    }

    /// Snapshot of every source. Applies the same lazy reset as `is_available`.
    pub fn status(&self) -> BTreeMap<SourceKind, BudgetStatus> {
        let now = self.clock.now_millis();
        self.budgets
            .iter()
            .map(|(&kind, state)| {
                let mut state = state.lock();
                state.roll_over(now);
                let remaining = match state.limit {
                    Limit::Limited(max) => Some(max.saturating_sub(state.used)),
                    Limit::Unlimited => None,
                };
                let reset_time =
                    DateTime::<Utc>::from_timestamp_millis(state.reset_at_ms).unwrap_or_default();
                (
                    kind,
                    BudgetStatus {
                        used: state.used,
                        limit: state.limit,
                        remaining,
                        reset_time,
                        available: state.has_room(),
                    },
                )
            })
            .collect()
    }

    fn settle(&self, source: SourceKind, commit: bool) {
        let mut state = self.state(source).lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        // A reset may have happened while the call was in flight
        state.roll_over(self.clock.now_millis());
        if commit && state.limit.allows(state.used) {
            state.used += 1;
        }
    }
}

/// A held budget slot for one adapter call.
#[must_use = "an unused reservation is released immediately"]
pub struct Reservation {
    tracker: Arc<RateBudgetTracker>,
    source: SourceKind,
    settled: bool,
}

impl Reservation {
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// The call produced tracks: charge it.
    pub fn commit(mut self) {
        self.settled = true;
        self.tracker.settle(self.source, true);
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.settle(self.source, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000_000;

    fn tracker(limit: Limit) -> (Arc<RateBudgetTracker>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let limits = BTreeMap::from([(SourceKind::Freesound, limit)]);
        (
            Arc::new(RateBudgetTracker::new(&limits, clock.clone())),
            clock,
        )
    }

    #[test]
    fn test_limit_parses_number_or_word() {
        #[derive(Deserialize)]
        struct Wrapper {
            a: Limit,
            b: Limit,
        }
        let w: Wrapper = toml::from_str("a = 100\nb = \"unlimited\"").unwrap();
        assert_eq!(w.a, Limit::Limited(100));
        assert_eq!(w.b, Limit::Unlimited);

        assert!(toml::from_str::<Wrapper>("a = \"lots\"\nb = 1").is_err());
    }

    #[test]
    fn test_unlisted_source_is_unlimited() {
        let (tracker, _) = tracker(Limit::Limited(1));
        for _ in 0..50 {
            tracker.record_use(SourceKind::Archive);
        }
        assert!(tracker.is_available(SourceKind::Archive));
        assert_eq!(tracker.status()[&SourceKind::Archive].remaining, None);
    }

    #[test]
    fn test_exhaustion() {
        let (tracker, _) = tracker(Limit::Limited(2));
        tracker.record_use(SourceKind::Freesound);
        assert!(tracker.is_available(SourceKind::Freesound));
        tracker.record_use(SourceKind::Freesound);
        assert!(!tracker.is_available(SourceKind::Freesound));

        // Capped
        tracker.record_use(SourceKind::Freesound);
        assert_eq!(tracker.status()[&SourceKind::Freesound].used, 2);
    }

    #[test]
    fn test_lazy_reset_moves_window_from_now() {
        let (tracker, clock) = tracker(Limit::Limited(1));
        tracker.record_use(SourceKind::Freesound);
        assert!(!tracker.is_available(SourceKind::Freesound));

        // Exactly at reset time is not "past" it
        clock.set(START + RESET_INTERVAL_MS);
        assert!(!tracker.is_available(SourceKind::Freesound));

        let now = START + RESET_INTERVAL_MS + 5_000;
        clock.set(now);
        assert!(tracker.is_available(SourceKind::Freesound));

        let status = &tracker.status()[&SourceKind::Freesound];
        assert_eq!(status.used, 0);
        assert_eq!(status.reset_time.timestamp_millis(), now + RESET_INTERVAL_MS);
    }

    #[test]
    fn test_record_use_after_expiry_resets_first() {
        let (tracker, clock) = tracker(Limit::Limited(5));
        tracker.record_use(SourceKind::Freesound);
        tracker.record_use(SourceKind::Freesound);

        clock.advance(RESET_INTERVAL_MS + 1);
        tracker.record_use(SourceKind::Freesound);
        assert_eq!(tracker.status()[&SourceKind::Freesound].used, 1);
    }

    #[test]
    fn test_reservation_commit_and_release() {
        let (tracker, _) = tracker(Limit::Limited(1));

        let held = tracker.try_reserve(SourceKind::Freesound).unwrap();
        assert_eq!(held.source(), SourceKind::Freesound);
        // The in-flight slot blocks a second caller
        assert!(tracker.try_reserve(SourceKind::Freesound).is_none());
        drop(held);

        // Released without charge
        assert_eq!(tracker.status()[&SourceKind::Freesound].used, 0);
        let held = tracker.try_reserve(SourceKind::Freesound).unwrap();
        held.commit();
        assert_eq!(tracker.status()[&SourceKind::Freesound].used, 1);
        assert!(tracker.try_reserve(SourceKind::Freesound).is_none());
    }

    #[test]
    fn test_concurrent_reservations_never_overrun() {
        let (tracker, _) = tracker(Limit::Limited(10));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        if let Some(r) = tracker.try_reserve(SourceKind::Freesound) {
                            r.commit();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let status = &tracker.status()[&SourceKind::Freesound];
        assert_eq!(status.used, 10);
        assert_eq!(status.remaining, Some(0));
        assert!(!status.available);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let (tracker, _) = tracker(Limit::Limited(3));
        let json = serde_json::to_value(tracker.status()).unwrap();
        assert_eq!(json["freesound"]["limit"], 3);
        assert_eq!(json["freesound"]["remaining"], 3);
        assert_eq!(json["archive"]["limit"], "unlimited");
        assert!(json["youtube"]["resetTime"].is_string());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Reserve { commit: bool },
            Record,
            Advance(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<bool>().prop_map(|commit| Op::Reserve { commit }),
                Just(Op::Record),
                (0..RESET_INTERVAL_MS / 2).prop_map(Op::Advance),
            ]
        }

        proptest! {
            /// `used` never exceeds the limit and only drops on a reset.
            #[test]
            fn used_is_bounded_and_monotonic_between_resets(
                limit in 1u64..20,
                ops in prop::collection::vec(op(), 1..200)
            ) {
                let (tracker, clock) = tracker(Limit::Limited(limit));
                let mut last_used = 0;
                let mut last_reset = tracker.status()[&SourceKind::Freesound].reset_time;

                for op in ops {
                    match op {
                        Op::Reserve { commit } => {
                            if let Some(r) = tracker.try_reserve(SourceKind::Freesound) {
                                if commit { r.commit(); }
                            }
                        }
                        Op::Record => tracker.record_use(SourceKind::Freesound),
                        Op::Advance(ms) => clock.advance(ms),
                    }

                    let status = &tracker.status()[&SourceKind::Freesound];
                    prop_assert!(status.used <= limit);
                    if status.reset_time == last_reset {
                        prop_assert!(status.used >= last_used);
                    } else {
                        prop_assert!(status.reset_time > last_reset);
                    }
                    last_used = status.used;
                    last_reset = status.reset_time;
                }
            }
        }
    }
}
