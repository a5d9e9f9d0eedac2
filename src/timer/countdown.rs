use super::Clock;

/// Longest countdown that can be set.
pub const MAX_COUNTDOWN_MINUTES: u64 = 999;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    /// Monotonic instant at which the countdown reaches zero.
    Running { ends_at: i64 },
    Paused { left_ms: u64 },
    Finished,
}

/// Count-down alarm. Lives only as long as the process; nothing is
/// persisted.
#[derive(Debug, Default)]
pub struct Countdown {
    total_ms: u64,
    phase: Phase,
}

impl Countdown {
    pub fn state(&self) -> CountdownState {
        match self.phase {
            Phase::Idle => CountdownState::Idle,
            Phase::Running { .. } => CountdownState::Running,
            Phase::Paused { .. } => CountdownState::Paused,
            Phase::Finished => CountdownState::Finished,
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Starts counting down from `duration_ms`. Returns false while a
    /// countdown is already running or paused, or for a zero duration.
    pub fn start(&mut self, duration_ms: u64, clock: &impl Clock) -> bool {
        if matches!(self.phase, Phase::Running { .. } | Phase::Paused { .. }) || duration_ms == 0 {
            return false;
        }
        let Ok(span) = i64::try_from(duration_ms) else {
            return false;
        };
        let Some(ends_at) = clock.monotonic_ms().checked_add(span) else {
            return false;
        };
        self.total_ms = duration_ms;
        self.phase = Phase::Running { ends_at };
        tracing::info!(duration_ms, "countdown started");
        true
    }

    pub fn pause(&mut self, clock: &impl Clock) -> bool {
        let Phase::Running { ends_at } = self.phase else {
            return false;
        };
        self.phase = Phase::Paused {
            left_ms: left_until(ends_at, clock),
        };
        true
    }

    pub fn resume(&mut self, clock: &impl Clock) -> bool {
        let Phase::Paused { left_ms } = self.phase else {
            return false;
        };
        // left_ms came from a running deadline, so it fits.
        self.phase = Phase::Running {
            ends_at: clock.monotonic_ms().saturating_add(left_ms as i64),
        };
        true
    }

    pub fn reset(&mut self) {
        self.total_ms = 0;
        self.phase = Phase::Idle;
    }

    pub fn remaining_ms(&self, clock: &impl Clock) -> u64 {
        match self.phase {
            Phase::Idle | Phase::Finished => 0,
            Phase::Running { ends_at } => left_until(ends_at, clock),
            Phase::Paused { left_ms } => left_ms,
        }
    }

    /// Moves a running countdown to `Finished` once it reaches zero. Returns
    /// true exactly once per countdown, when the alarm should sound.
    pub fn tick(&mut self, clock: &impl Clock) -> bool {
        let Phase::Running { ends_at } = self.phase else {
            return false;
        };
        if left_until(ends_at, clock) > 0 {
            return false;
        }
        self.phase = Phase::Finished;
        tracing::info!(duration_ms = self.total_ms, "countdown finished");
        true
    }
}

fn left_until(ends_at: i64, clock: &impl Clock) -> u64 {
    (ends_at - clock.monotonic_ms()).max(0) as u64
}
