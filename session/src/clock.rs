use chrono::{DateTime, TimeDelta, Utc};

/// Length of one timed turn.
pub const TURN_DURATION_SECS: i64 = 15;

/// Local estimate of when the current turn started.
///
/// The authority periodically emits `(turnStartTime, serverTimestamp)`
/// pairs in its own clock; the estimate translates the authority's
/// elapsed-since-turn-start delta onto the local clock instead of trusting
/// the raw timestamp, so skewed clocks never produce a negative or runaway
/// countdown. The anchor is always replaced wholesale, never nudged, so
/// drift cannot accumulate across reconciliations.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TurnClock {
    anchor: Option<DateTime<Utc>>,
}

impl TurnClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
    }

    /// Starts a fresh local turn at `now` (singleplayer, or a round start
    /// that carried no clock fields).
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.anchor = Some(now);
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Reconciles against an authoritative `(turnStartTime, serverTimestamp)`
    /// pair, both in epoch milliseconds of the authority's clock.
    ///
    /// Without a server timestamp the raw start is used directly, clamped
    /// to `now` when it lies in the local future (skewed clock or stale
    /// message).
    pub fn sync(&mut self, turn_start_ms: i64, server_timestamp_ms: Option<i64>, now: DateTime<Utc>) {
        match server_timestamp_ms {
            Some(server_now_ms) => {
                let authority_elapsed = server_now_ms - turn_start_ms;
                self.anchor = Some(now - TimeDelta::milliseconds(authority_elapsed));
            }
            None => match DateTime::from_timestamp_millis(turn_start_ms) {
                Some(raw) if raw > now => {
                    log::debug!("turn start {:?} is in the local future, clamping to now", raw);
                    self.anchor = Some(now);
                }
                Some(raw) => self.anchor = Some(raw),
                None => {
                    log::warn!("unrepresentable turn start {}, clamping to now", turn_start_ms);
                    self.anchor = Some(now);
                }
            },
        }
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        let anchor = self.anchor?;
        Some((now - anchor).num_milliseconds().div_euclid(1000))
    }

    /// Seconds left in the current turn, clamped to `[0, 15]`.
    ///
    /// An unanchored clock and a negative elapsed (anchor still in the
    /// local future) both read the full turn.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        match self.elapsed_secs(now) {
            Some(elapsed) if elapsed >= 0 => (TURN_DURATION_SECS - elapsed).clamp(0, TURN_DURATION_SECS),
            _ => TURN_DURATION_SECS,
        }
    }

    /// Whether the anchored turn has run out.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_secs(now)
            .is_some_and(|elapsed| elapsed >= TURN_DURATION_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn fresh_anchor_reads_a_full_turn() {
        // authority clock and local clock disagree by 4 seconds
        let mut clock = TurnClock::new();
        clock.sync(1000, Some(1000), ts(5000));
        assert_eq!(clock.remaining_secs(ts(5000)), 15);
        assert!(!clock.expired(ts(5000)));
    }

    #[test]
    fn skewed_authority_clock_is_translated() {
        // the authority says 5 seconds of the turn are gone
        let mut clock = TurnClock::new();
        clock.sync(1000, Some(6000), ts(5000));
        assert_eq!(clock.remaining_secs(ts(5000)), 10);
        assert_eq!(clock.remaining_secs(ts(9000)), 6);
    }

    #[test]
    fn missing_timestamp_clamps_future_start_to_now() {
        let mut clock = TurnClock::new();
        clock.sync(10_000, None, ts(5000));
        assert_eq!(clock.remaining_secs(ts(5000)), 15);
    }

    #[test]
    fn missing_timestamp_trusts_past_start() {
        let mut clock = TurnClock::new();
        clock.sync(2000, None, ts(5000));
        assert_eq!(clock.remaining_secs(ts(5000)), 12);
    }

    #[test]
    fn countdown_never_jumps_upward_across_resyncs() {
        // same turnStartTime, strictly increasing serverTimestamp, local
        // clock advancing in lockstep
        let mut clock = TurnClock::new();
        let mut previous = TURN_DURATION_SECS;
        for step in 0..12i64 {
            let local_now = ts(20_000 + step * 1000);
            clock.sync(1000, Some(1000 + step * 1000), local_now);
            let remaining = clock.remaining_secs(local_now);
            assert!(remaining <= previous, "step {}: {} > {}", step, remaining, previous);
            previous = remaining;
        }
    }

    #[test]
    fn remaining_floors_partial_seconds() {
        let mut clock = TurnClock::new();
        clock.restart(ts(0));
        assert_eq!(clock.remaining_secs(ts(999)), 15);
        assert_eq!(clock.remaining_secs(ts(1000)), 14);
        assert_eq!(clock.remaining_secs(ts(14_999)), 1);
        assert_eq!(clock.remaining_secs(ts(15_000)), 0);
    }

    #[test]
    fn expiry_at_full_duration() {
        let mut clock = TurnClock::new();
        clock.restart(ts(0));
        assert!(!clock.expired(ts(14_999)));
        assert!(clock.expired(ts(15_000)));
        assert_eq!(clock.remaining_secs(ts(60_000)), 0);
    }

    #[test]
    fn unanchored_clock_never_expires() {
        let clock = TurnClock::new();
        assert!(!clock.expired(ts(1_000_000)));
        assert_eq!(clock.remaining_secs(ts(1_000_000)), 15);
    }

    #[test]
    fn anchor_is_replaced_wholesale() {
        let mut clock = TurnClock::new();
        clock.sync(1000, Some(4000), ts(10_000));
        assert_eq!(clock.remaining_secs(ts(10_000)), 12);
        // a later authoritative pair fully supersedes the previous anchor
        clock.sync(20_000, Some(20_500), ts(11_000));
        assert_eq!(clock.remaining_secs(ts(11_000)), 15);
    }
}
