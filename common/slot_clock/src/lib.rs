//! C1: maps wall-clock time to `Slot`s and back. Every other component (block production,
//! attestation production, fork choice's `on_tick`) reads "what slot/epoch is it" through this
//! trait rather than calling `SystemTime::now()` itself, so tests can swap in a
//! [`ManualSlotClock`] that never drifts.

#[macro_use]
extern crate lazy_static;

mod metrics;

use parking_lot::RwLock;
use std::time::{Duration, SystemTime, SystemTimeError, UNIX_EPOCH};
use types::Slot;

pub use types::Slot as SlotNumber;

/// Anything that can answer "what slot is it" and "how long until the next one".
///
/// `new` takes the genesis slot (almost always `Slot::new(0)`, but kept generic for networks
/// that fork-in partway through another chain's numbering) rather than assuming zero.
pub trait SlotClock: Send + Sync + Sized + Clone {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self;

    /// `None` iff the current wall-clock time is before genesis.
    fn now(&self) -> Option<Slot>;

    fn now_duration(&self) -> Option<Duration>;

    fn slot_duration(&self) -> Duration;

    fn genesis_duration(&self) -> Duration;

    fn genesis_slot(&self) -> Slot;

    /// Time remaining until the start of the next slot, or `None` if called before genesis.
    fn duration_to_next_slot(&self) -> Option<Duration>;

    /// Time remaining until the start of `slot`, or `None` if `slot` has already started.
    fn duration_to_slot(&self, slot: Slot) -> Option<Duration> {
        let now = self.now()?;
        if slot <= now {
            return None;
        }
        self.slot_duration()
            .checked_mul((slot.as_u64() - now.as_u64()) as u32)
            .and_then(|toward_slot| {
                self.duration_to_next_slot()
                    .map(|to_next| to_next + toward_slot - self.slot_duration())
            })
    }

    fn is_prior_to_genesis(&self) -> bool {
        self.now().is_none()
    }
}

/// Reads the real system clock. The one implementation a running node ever uses; every other
/// consumer of `SlotClock` only ever sees the trait.
#[derive(Clone)]
pub struct SystemTimeSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
}

impl SystemTimeSlotClock {
    fn duration_since_genesis(&self) -> Option<Duration> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|now| now.checked_sub(self.genesis_duration))
    }
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        if slot_duration.as_millis() == 0 {
            panic!("SystemTimeSlotClock requires a non-zero slot duration");
        }
        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        let elapsed = self.duration_since_genesis()?;
        let slots_since_genesis = elapsed.as_millis() / self.slot_duration.as_millis();
        metrics::set_gauge(&metrics::PRESENT_SLOT, slots_since_genesis as i64);
        Some(self.genesis_slot + slots_since_genesis as u64)
    }

    fn now_duration(&self) -> Option<Duration> {
        self.duration_since_genesis()
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_duration(&self) -> Duration {
        self.genesis_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let elapsed = self.duration_since_genesis()?;
        let millis_into_slot = elapsed.as_millis() % self.slot_duration.as_millis();
        Some(self.slot_duration - Duration::from_millis(millis_into_slot as u64))
    }
}

/// A clock that only ever advances when told to — used by tests and local dev networks to drive
/// slot progression deterministically instead of waiting on wall-clock time.
#[derive(Clone)]
pub struct ManualSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    current: std::sync::Arc<RwLock<Duration>>,
    slot_duration: Duration,
}

impl ManualSlotClock {
    pub fn set_slot(&self, slot: u64) {
        let slots_since_genesis = slot.saturating_sub(self.genesis_slot.as_u64());
        *self.current.write() =
            self.genesis_duration + self.slot_duration * slots_since_genesis as u32;
    }

    pub fn advance_slot(&self) {
        self.set_slot(self.now().map_or(self.genesis_slot, |s| s + 1).as_u64())
    }
}

impl SlotClock for ManualSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            genesis_duration,
            current: std::sync::Arc::new(RwLock::new(genesis_duration)),
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        let current = *self.current.read();
        current
            .checked_sub(self.genesis_duration)
            .map(|elapsed| self.genesis_slot + (elapsed.as_millis() / self.slot_duration.as_millis()) as u64)
    }

    fn now_duration(&self) -> Option<Duration> {
        Some(*self.current.read())
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_duration(&self) -> Duration {
        self.genesis_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let current = *self.current.read();
        let elapsed = current.checked_sub(self.genesis_duration)?;
        let millis_into_slot = elapsed.as_millis() % self.slot_duration.as_millis();
        Some(self.slot_duration - Duration::from_millis(millis_into_slot as u64))
    }
}

/// Wraps the error `SystemTime::duration_since` can return when the system clock moved backward
/// across `UNIX_EPOCH` — practically unreachable but kept so callers aren't forced to `unwrap`.
#[derive(Debug)]
pub struct ClockError(SystemTimeError);

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SystemTimeSlotClock {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        SystemTimeSlotClock::new(
            Slot::new(0),
            now.checked_sub(Duration::from_secs(24)).unwrap(),
            Duration::from_secs(12),
        )
    }

    #[test]
    fn reports_slot_two_after_24_seconds_with_12_second_slots() {
        assert_eq!(clock().now(), Some(Slot::new(2)));
    }

    #[test]
    fn prior_to_genesis_reports_none() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        let clock = SystemTimeSlotClock::new(
            Slot::new(0),
            now + Duration::from_secs(1_000),
            Duration::from_secs(12),
        );
        assert!(clock.is_prior_to_genesis());
        assert_eq!(clock.now(), None);
    }

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        assert_eq!(clock.now(), Some(Slot::new(0)));
        clock.advance_slot();
        assert_eq!(clock.now(), Some(Slot::new(1)));
        clock.set_slot(10);
        assert_eq!(clock.now(), Some(Slot::new(10)));
    }
}
