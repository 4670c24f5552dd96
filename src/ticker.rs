//! Periodic shift re-evaluation.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::shift::{ShiftDefinition, ShiftParseError, TimeOfDay};
use crate::ui::UiMessage;

/// Source of the current time of day.
pub trait Clock: Send + Sync + 'static {
    fn time_of_day(&self) -> TimeOfDay;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::now_local()
    }
}

/// Clock stuck at one time of day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub TimeOfDay);

impl Clock for FixedClock {
    fn time_of_day(&self) -> TimeOfDay {
        self.0
    }
}

/// Re-evaluate `shift` every `period` and send the result to the UI.
///
/// Each tick samples the clock once. Stops when the receiving side is dropped.
pub async fn run_shift_ticker<C: Clock>(
    shift: Result<ShiftDefinition, ShiftParseError>,
    grace_seconds: u32,
    period: Duration,
    clock: C,
    tx: mpsc::UnboundedSender<UiMessage>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let sampled_at = clock.time_of_day();
        let state = match &shift {
            Ok(definition) => Ok(definition.evaluate(sampled_at, grace_seconds)),
            Err(e) => Err(e.clone()),
        };

        if tx.send(UiMessage::ShiftState { sampled_at, state }).is_err() {
            debug!("UI receiver dropped, stopping shift ticker");
            break;
        }
    }
}

/// Spawn [`run_shift_ticker`] on the current runtime.
pub fn spawn_shift_ticker<C: Clock>(
    shift: Result<ShiftDefinition, ShiftParseError>,
    grace_seconds: u32,
    period: Duration,
    clock: C,
    tx: mpsc::UnboundedSender<UiMessage>,
) -> JoinHandle<()> {
    tokio::spawn(run_shift_ticker(shift, grace_seconds, period, clock, tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::DEFAULT_GRACE_SECONDS;

    fn fixed(seconds: u32) -> FixedClock {
        FixedClock(TimeOfDay::from_seconds(seconds).unwrap())
    }

    #[tokio::test]
    async fn test_ticker_sends_states() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let shift = ShiftDefinition::parse("08:00 - 16:00");
        let handle = spawn_shift_ticker(shift, DEFAULT_GRACE_SECONDS, Duration::from_millis(5), fixed(30_000), tx);

        for _ in 0..3 {
            match rx.recv().await {
                Some(UiMessage::ShiftState { sampled_at, state }) => {
                    assert_eq!(sampled_at.seconds(), 30_000);
                    let state = state.unwrap();
                    assert!(state.is_late);
                    assert!(state.is_allowed_time);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }

        drop(rx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_ticker_forwards_parse_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let shift = ShiftDefinition::parse("8am-4pm");
        let handle = spawn_shift_ticker(shift, DEFAULT_GRACE_SECONDS, Duration::from_millis(5), fixed(0), tx);

        match rx.recv().await {
            Some(UiMessage::ShiftState { state, .. }) => {
                assert!(matches!(state, Err(ShiftParseError::Format(_))));
            }
            other => panic!("unexpected message {other:?}"),
        }

        drop(rx);
        handle.await.unwrap();
    }

    #[test]
    fn test_local_clock_in_range() {
        assert!(LocalClock.time_of_day().seconds() < 86_400);
    }
}
