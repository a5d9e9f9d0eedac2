/// Durable stopwatch.
///
/// The session is persisted on every transition with its resume point as a
/// wall-clock timestamp. On launch that timestamp is mapped back onto this
/// process's monotonic scale through an offset computed once, so a session
/// left running across a restart keeps counting.
mod clock;
mod countdown;
mod ticker;

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};

use crate::store::{SessionStore, TimerSnapshot};
use crate::types::TimeEntryDraft;

pub use clock::{Clock, SystemClock};
pub use countdown::{Countdown, CountdownState, MAX_COUNTDOWN_MINUTES};
#[cfg(test)]
pub(crate) use clock::manual::ManualClock;
pub use ticker::Ticker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
struct Session {
    started_at: DateTime<Local>,
    accumulated_ms: u64,
    /// Monotonic start of the current running segment; `None` while paused.
    resumed_at: Option<i64>,
}

pub struct Timer<C: Clock> {
    clock: C,
    session: Option<Session>,
    /// Monotonic minus wall-clock milliseconds, fixed at construction.
    offset_ms: i64,
    displayed_ms: u64,
}

impl<C: Clock> Timer<C> {
    /// Builds the timer, restoring any session persisted by an earlier run.
    pub fn restore(clock: C, store: &impl SessionStore) -> Self {
        let offset_ms = clock.monotonic_ms() - clock.wall_now().timestamp_millis();
        let session = store
            .load_session()
            .and_then(|snapshot| session_from_snapshot(snapshot, offset_ms, &clock));
        if let Some(session) = &session {
            tracing::debug!(
                accumulated_ms = session.accumulated_ms,
                running = session.resumed_at.is_some(),
                "restored timer session"
            );
        }
        let mut timer = Self {
            clock,
            session,
            offset_ms,
            displayed_ms: 0,
        };
        timer.displayed_ms = timer.elapsed_ms();
        timer
    }

    pub fn state(&self) -> TimerState {
        match &self.session {
            None => TimerState::Idle,
            Some(session) if session.resumed_at.is_some() => TimerState::Running,
            Some(_) => TimerState::Paused,
        }
    }

    pub fn wall_now(&self) -> DateTime<Local> {
        self.clock.wall_now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.session.as_ref().map(|session| session.started_at)
    }

    /// Elapsed time of the current session, derived from the clock.
    pub fn elapsed_ms(&self) -> u64 {
        let Some(session) = &self.session else {
            return 0;
        };
        let running_ms = session
            .resumed_at
            .map(|resumed_at| (self.clock.monotonic_ms() - resumed_at).max(0) as u64)
            .unwrap_or(0);
        session.accumulated_ms + running_ms
    }

    /// Last value computed for display.
    pub fn displayed_ms(&self) -> u64 {
        self.displayed_ms
    }

    /// Refreshes the displayed elapsed time. Only meaningful while running.
    pub fn tick(&mut self) -> u64 {
        if self.state() == TimerState::Running {
            self.displayed_ms = self.elapsed_ms();
        }
        self.displayed_ms
    }

    /// Starts a new session. Returns false unless idle.
    pub fn start(&mut self, store: &impl SessionStore) -> Result<bool> {
        if self.session.is_some() {
            tracing::debug!(state = ?self.state(), "start ignored");
            return Ok(false);
        }
        let session = Session {
            started_at: self.clock.wall_now(),
            accumulated_ms: 0,
            resumed_at: Some(self.clock.monotonic_ms()),
        };
        self.commit(session, store)?;
        self.displayed_ms = 0;
        tracing::info!("timer started");
        Ok(true)
    }

    /// Banks the running segment. Returns false unless running.
    pub fn pause(&mut self, store: &impl SessionStore) -> Result<bool> {
        let Some(session) = &self.session else {
            tracing::debug!("pause ignored, no session");
            return Ok(false);
        };
        let Some(resumed_at) = session.resumed_at else {
            tracing::debug!("pause ignored, already paused");
            return Ok(false);
        };
        let segment_ms = (self.clock.monotonic_ms() - resumed_at).max(0) as u64;
        let paused = Session {
            accumulated_ms: session.accumulated_ms + segment_ms,
            resumed_at: None,
            ..session.clone()
        };
        self.displayed_ms = paused.accumulated_ms;
        self.commit(paused, store)?;
        tracing::info!(accumulated_ms = self.displayed_ms, "timer paused");
        Ok(true)
    }

    /// Opens a new running segment. Returns false unless paused.
    pub fn resume(&mut self, store: &impl SessionStore) -> Result<bool> {
        let Some(session) = &self.session else {
            tracing::debug!("resume ignored, no session");
            return Ok(false);
        };
        if session.resumed_at.is_some() {
            tracing::debug!("resume ignored, already running");
            return Ok(false);
        }
        let resumed = Session {
            resumed_at: Some(self.clock.monotonic_ms()),
            ..session.clone()
        };
        self.commit(resumed, store)?;
        tracing::info!("timer resumed");
        Ok(true)
    }

    /// Ends the session and returns an uncategorized draft covering it.
    /// Returns `None` when idle.
    pub fn stop(&mut self, store: &impl SessionStore) -> Result<Option<TimeEntryDraft>> {
        let Some(session) = &self.session else {
            tracing::debug!("stop ignored, no session");
            return Ok(None);
        };
        let draft = TimeEntryDraft {
            started_at: session.started_at,
            stopped_at: self.clock.wall_now(),
            duration_ms: self.elapsed_ms(),
            category: String::new(),
        };
        store.clear_session()?;
        self.session = None;
        self.displayed_ms = 0;
        tracing::info!(duration_ms = draft.duration_ms, "timer stopped");
        Ok(Some(draft))
    }

    /// Discards any session without producing a draft.
    pub fn reset(&mut self, store: &impl SessionStore) -> Result<()> {
        store.clear_session()?;
        self.session = None;
        self.displayed_ms = 0;
        tracing::info!("timer reset");
        Ok(())
    }

    fn commit(&mut self, session: Session, store: &impl SessionStore) -> Result<()> {
        let snapshot = TimerSnapshot {
            accumulated_ms: session.accumulated_ms,
            is_running: true,
            is_paused: session.resumed_at.is_none(),
            started_at_ms: session.started_at.timestamp_millis(),
            last_resume_time_ms: session.resumed_at.map(|resumed_at| resumed_at - self.offset_ms),
        };
        store.save_session(&snapshot)?;
        self.session = Some(session);
        Ok(())
    }
}

fn session_from_snapshot(
    snapshot: TimerSnapshot,
    offset_ms: i64,
    clock: &impl Clock,
) -> Option<Session> {
    if !snapshot.is_running {
        return None;
    }
    let Some(started_at) = Local.timestamp_millis_opt(snapshot.started_at_ms).single() else {
        tracing::warn!(
            started_at_ms = snapshot.started_at_ms,
            "discarding timer session with invalid start"
        );
        return None;
    };
    let now_ms = clock.monotonic_ms();
    let resumed_at = if snapshot.is_paused {
        None
    } else {
        match snapshot.last_resume_time_ms {
            // A resume point ahead of now means the wall clock went back
            // while we were down.
            Some(wall_ms) => Some((wall_ms + offset_ms).min(now_ms)),
            None => {
                tracing::warn!("running timer session without resume point, resuming from now");
                Some(now_ms)
            }
        }
    };
    Some(Session {
        started_at,
        accumulated_ms: snapshot.accumulated_ms,
        resumed_at,
    })
}
