use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};

use crate::app::{App, AppEvent};
use crate::timer::Clock;

/// Waits for the next crossterm event and maps it to an `AppEvent`.
///
/// With no timeout this blocks until input arrives; otherwise an elapsed
/// timeout yields a tick.
pub fn poll(timeout: Option<Duration>) -> Result<Option<AppEvent>> {
    if let Some(timeout) = timeout {
        if !event::poll(timeout)? {
            return Ok(Some(AppEvent::Tick));
        }
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            Ok(Some(AppEvent::KeyPress(key.code)))
        }
        Event::Resize(_, _) => Ok(Some(AppEvent::Tick)),
        _ => Ok(None),
    }
}

/// Runs the main event loop.
pub fn run<C: Clock>(app: &mut App<C>, terminal: &mut crate::tui::Terminal) -> Result<()> {
    while app.running {
        terminal.draw(|frame| crate::ui::draw(frame, app))?;

        if let Some(event) = poll(app.ticker.timeout())? {
            app.update(event);
        }
        if app.take_alarm() {
            crate::tui::ring_bell(terminal)?;
        }
    }
    Ok(())
}
