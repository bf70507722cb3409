//! Progress ticks and the heartbeat timer.
//!
//! Workers report every finished subject to a [`Ticker`]; every `interval`
//! subjects it calls the [`ProgressSink`] while holding its mutex, so sink
//! calls never overlap. The heartbeat runs on its own thread, wakes on a
//! crossbeam `tick` channel and reports when no progress tick happened for a
//! whole period. It exits as soon as its stop channel disconnects.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver};
use log::trace;

/// Receiver of search progress. Calls must return quickly.
pub trait ProgressSink: Sync {
    fn on_progress(&self, subjects_done: usize, positive_hits: usize);

    /// No progress tick for at least `idle`
    fn on_heartbeat(&self, _subjects_done: usize, _idle: Duration) {}
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _subjects_done: usize, _positive_hits: usize) {}
}

#[derive(Debug)]
struct TickState {
    done: usize,
    reported: usize,
    last_tick: Instant,
}

#[derive(Debug)]
pub struct Ticker {
    interval: usize,
    state: Mutex<TickState>,
}

impl Ticker {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            state: Mutex::new(TickState {
                done: 0,
                reported: 0,
                last_tick: Instant::now(),
            }),
        }
    }

    /// Count one finished subject
    pub fn subject_done<P: ProgressSink + ?Sized>(&self, sink: &P, positive_hits: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.done += 1;
        if state.done % self.interval == 0 {
            state.last_tick = Instant::now();
            state.reported = state.done;
            sink.on_progress(state.done, positive_hits);
        }
    }

    /// Report the final count if the last subjects did not complete an interval
    pub fn flush<P: ProgressSink + ?Sized>(&self, sink: &P, positive_hits: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.reported != state.done {
            state.last_tick = Instant::now();
            state.reported = state.done;
            sink.on_progress(state.done, positive_hits);
        }
    }

    pub fn subjects_done(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).done
    }

    fn idle(&self) -> (usize, Duration) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.done, state.last_tick.elapsed())
    }
}

/// Body of the heartbeat thread; returns once `stop` disconnects
pub fn run_heartbeat<P: ProgressSink + ?Sized>(
    period: Duration,
    ticker: &Ticker,
    sink: &P,
    stop: Receiver<()>,
) {
    let ticks = tick(period);
    loop {
        select! {
            recv(ticks) -> _ => {
                let (done, idle) = ticker.idle();
                if idle >= period {
                    trace!("heartbeat: {} subjects done, idle {:?}", done, idle);
                    sink.on_heartbeat(done, idle);
                }
            }
            recv(stop) -> _ => break,
        }
    }
}
