use std::time::Duration;

use crossterm::event::KeyCode;
use rusqlite::Connection;

use crate::auto::reconcile_auto_entry;
use crate::caps::enforce_capped_add;
use crate::config::Config;
use crate::store::EntryStore;
use crate::timer::{
    Clock, Countdown, CountdownState, MAX_COUNTDOWN_MINUTES, Ticker, Timer, TimerState,
};
use crate::totals::day_totals;
use crate::types::{DayTotals, TimeEntryDraft};

use super::AppEvent;

const DEFAULT_COUNTDOWN_MINUTES: &str = "5";

/// The top-level state of the interactive stopwatch.
pub struct App<C: Clock> {
    pub running: bool,
    pub db: Connection,
    pub config: Config,
    pub timer: Timer<C>,
    pub countdown: Countdown,
    pub ticker: Ticker,
    pub today: DayTotals,
    pub status: Option<String>,
    pub category_prompt: Option<CategoryPrompt>,
    /// Minutes typed for a new countdown.
    pub countdown_prompt: Option<String>,
    alarm_pending: bool,
}

/// A stopped session waiting for its category.
#[derive(Clone, Debug)]
pub struct CategoryPrompt {
    pub input: String,
    pub draft: TimeEntryDraft,
}

impl<C: Clock> App<C> {
    pub fn new(db: Connection, config: Config, clock: C) -> Self {
        let timer = Timer::restore(clock, &db);
        let ticker = Ticker::new(Duration::from_millis(config.tick_rate_ms));
        let today = day_totals(&[], timer.wall_now(), &config);
        let mut app = Self {
            running: true,
            db,
            config,
            timer,
            countdown: Countdown::default(),
            ticker,
            today,
            status: None,
            category_prompt: None,
            countdown_prompt: None,
            alarm_pending: false,
        };
        app.sync_ticker();
        app.refresh();
        app
    }

    /// Central update function - process an event and mutate state.
    pub fn update(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => {
                self.ticker.poll_due();
                self.timer.tick();
                if self.countdown.tick(self.timer.clock()) {
                    self.alarm_pending = true;
                    self.status = Some("Countdown finished.".to_string());
                    self.sync_ticker();
                }
            }
            AppEvent::KeyPress(key) => self.handle_key(key),
        }
    }

    /// Whether the countdown alarm should sound. Clears the request.
    pub fn take_alarm(&mut self) -> bool {
        std::mem::take(&mut self.alarm_pending)
    }

    /// Starts a countdown of `minutes`, as if typed into the prompt.
    pub fn start_countdown(&mut self, minutes: u64) {
        let started = minutes <= MAX_COUNTDOWN_MINUTES
            && self.countdown.start(minutes * 60_000, self.timer.clock());
        if !started {
            self.status = Some(format!("Countdown needs 1 to {MAX_COUNTDOWN_MINUTES} minutes."));
        }
        self.sync_ticker();
    }

    fn handle_key(&mut self, key: KeyCode) {
        if self.category_prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if self.countdown_prompt.is_some() {
            self.handle_countdown_prompt_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char(' ') => self.toggle_timer(),
            KeyCode::Char('s') => self.stop_timer(),
            KeyCode::Char('x') => self.reset_timer(),
            KeyCode::Char('c') => self.toggle_countdown(),
            KeyCode::Char('C') => {
                self.countdown.reset();
                self.clear_status();
                self.sync_ticker();
            }
            KeyCode::Char('r') => {
                self.clear_status();
                self.refresh();
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyCode) {
        let Some(prompt) = self.category_prompt.as_mut() else {
            return;
        };
        match key {
            KeyCode::Esc => {
                self.category_prompt = None;
                self.status = Some("Stopped session discarded.".to_string());
            }
            KeyCode::Enter => {
                let category = prompt.input.trim().to_string();
                self.submit_category(category);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                prompt.input.pop();
            }
            KeyCode::Char(ch) if prompt.input.is_empty() && ch.is_ascii_digit() => {
                let preset = ch
                    .to_digit(10)
                    .and_then(|digit| digit.checked_sub(1))
                    .and_then(|index| self.config.presets.get(index as usize))
                    .cloned();
                match preset {
                    Some(category) => self.submit_category(category),
                    None => prompt.input.push(ch),
                }
            }
            KeyCode::Char(ch) => {
                if ch.is_control() {
                    return;
                }
                prompt.input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_countdown_prompt_key(&mut self, key: KeyCode) {
        let Some(input) = self.countdown_prompt.as_mut() else {
            return;
        };
        match key {
            KeyCode::Esc => self.countdown_prompt = None,
            KeyCode::Enter => {
                let Ok(minutes) = input.parse::<u64>() else {
                    return;
                };
                if minutes == 0 || minutes > MAX_COUNTDOWN_MINUTES {
                    return;
                }
                self.countdown_prompt = None;
                self.clear_status();
                self.start_countdown(minutes);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                input.pop();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() && input.len() < 3 => input.push(ch),
            _ => {}
        }
    }

    fn toggle_timer(&mut self) {
        let result = match self.timer.state() {
            TimerState::Idle => self.timer.start(&self.db),
            TimerState::Running => self.timer.pause(&self.db),
            TimerState::Paused => self.timer.resume(&self.db),
        };
        if let Err(err) = result {
            self.status = Some(format!("Failed to update stopwatch: {err}"));
        } else {
            self.clear_status();
        }
        self.sync_ticker();
    }

    fn toggle_countdown(&mut self) {
        match self.countdown.state() {
            CountdownState::Idle | CountdownState::Finished => {
                self.countdown_prompt = Some(DEFAULT_COUNTDOWN_MINUTES.to_string());
            }
            CountdownState::Running => {
                self.countdown.pause(self.timer.clock());
            }
            CountdownState::Paused => {
                self.countdown.resume(self.timer.clock());
            }
        }
        self.sync_ticker();
    }

    fn stop_timer(&mut self) {
        match self.timer.stop(&self.db) {
            Ok(Some(draft)) => {
                self.category_prompt = Some(CategoryPrompt {
                    input: String::new(),
                    draft,
                });
                self.clear_status();
            }
            Ok(None) => self.status = Some("Stopwatch is not running.".to_string()),
            Err(err) => self.status = Some(format!("Failed to stop stopwatch: {err}")),
        }
        self.sync_ticker();
    }

    fn reset_timer(&mut self) {
        if let Err(err) = self.timer.reset(&self.db) {
            self.status = Some(format!("Failed to reset stopwatch: {err}"));
        } else {
            self.status = Some("Stopwatch reset.".to_string());
        }
        self.sync_ticker();
    }

    fn submit_category(&mut self, category: String) {
        let Some(prompt) = self.category_prompt.as_ref() else {
            return;
        };
        if category.is_empty() {
            return;
        }
        let draft = TimeEntryDraft {
            category,
            ..prompt.draft.clone()
        };
        match enforce_capped_add(draft, &self.config, &self.db) {
            Ok(saved) => {
                self.category_prompt = None;
                let logged = saved
                    .iter()
                    .map(|entry| entry.category.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ");
                self.status = Some(format!("Logged to {logged}."));
                self.refresh();
            }
            Err(err) => self.status = Some(format!("Failed to save entry: {err}")),
        }
    }

    /// Reconciles the auto entry and recomputes today's totals.
    pub fn refresh(&mut self) {
        let now = self.timer.wall_now();
        let mut entries = self.db.list_entries();
        match reconcile_auto_entry(&entries, now, &self.config, &self.db) {
            Ok(outcome) if outcome.changed() => entries = self.db.list_entries(),
            Ok(_) => {}
            Err(err) => self.status = Some(format!("Failed to reconcile idle time: {err}")),
        }
        self.today = day_totals(&entries, now, &self.config);
    }

    fn sync_ticker(&mut self) {
        let counting = self.timer.state() == TimerState::Running
            || self.countdown.state() == CountdownState::Running;
        if counting {
            self.ticker.arm();
        } else {
            self.ticker.disarm();
        }
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
