use ratatui::{
    Frame,
    prelude::Alignment,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::App;
use crate::format::{clamp_name, format_clock, format_countdown};
use crate::timer::{Clock, CountdownState, TimerState};

/// Renders the watch screen for a single frame.
pub fn draw<C: Clock>(frame: &mut Frame, app: &App<C>) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format_clock(app.timer.displayed_ms()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", app.timer.state())),
        ]),
    ];
    if let Some(line) = countdown_line(app) {
        lines.push(line);
    }
    lines.push(Line::from(""));

    if let Some(prompt) = &app.category_prompt {
        lines.push(Line::from(format!(
            "Category for {}: {}_",
            format_clock(prompt.draft.duration_ms),
            prompt.input
        )));
        let presets = app
            .config
            .presets
            .iter()
            .take(9)
            .enumerate()
            .map(|(index, preset)| format!("{} {preset}", index + 1))
            .collect::<Vec<_>>()
            .join("  ");
        if !presets.is_empty() {
            lines.push(Line::from(presets));
        }
        lines.push(Line::from("Enter: save. Esc: discard."));
        lines.push(Line::from(""));
    }

    if let Some(input) = &app.countdown_prompt {
        lines.push(Line::from(format!("Countdown minutes: {input}_")));
        lines.push(Line::from("Enter: start. Esc: cancel."));
        lines.push(Line::from(""));
    }

    if let Some(status) = &app.status {
        lines.push(Line::from(status.as_str()));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        format!(
            "Today ({})  total {}",
            app.today.day.format("%a %d %b"),
            format_clock(app.today.grand_total_ms)
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if app.today.totals.is_empty() {
        lines.push(Line::from("  No entries yet."));
    }
    for total in &app.today.totals {
        lines.push(Line::from(format!(
            "  {} {}",
            clamp_name(&total.category, 24),
            format_clock(total.duration_ms)
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(keybinds(app.timer.state())));
    lines.push(Line::from(countdown_keybinds(app.countdown.state())));

    let body = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Daytally "),
        );
    frame.render_widget(body, frame.area());
}

fn countdown_line<C: Clock>(app: &App<C>) -> Option<Line<'static>> {
    let clock = app.timer.clock();
    let text = match app.countdown.state() {
        CountdownState::Idle => return None,
        CountdownState::Running => format!(
            "Countdown {} of {}",
            format_countdown(app.countdown.remaining_ms(clock)),
            format_clock(app.countdown.total_ms())
        ),
        CountdownState::Paused => format!(
            "Countdown {} paused",
            format_countdown(app.countdown.remaining_ms(clock))
        ),
        CountdownState::Finished => "Countdown 00:00  time's up".to_string(),
    };
    Some(Line::from(text))
}

fn countdown_keybinds(state: CountdownState) -> &'static str {
    match state {
        CountdownState::Idle | CountdownState::Finished => "c countdown  C clear",
        CountdownState::Running => "c pause countdown  C clear",
        CountdownState::Paused => "c resume countdown  C clear",
    }
}

fn keybinds(state: TimerState) -> &'static str {
    match state {
        TimerState::Idle => "space start  r refresh  q quit",
        TimerState::Running => "space pause  s stop  x reset  r refresh  q quit",
        TimerState::Paused => "space resume  s stop  x reset  r refresh  q quit",
    }
}
