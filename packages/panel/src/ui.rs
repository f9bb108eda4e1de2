//! Label layout for the status panel.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::PanelApp;

pub fn draw(frame: &mut Frame, app: &PanelApp) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // title + bot state
        Constraint::Length(6), // statistics labels
        Constraint::Min(4),    // last published summary
        Constraint::Length(1), // help
    ])
    .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_statistics(frame, app, chunks[1]);
    draw_last_published(frame, app, chunks[2]);
    draw_help(frame, chunks[3]);
}

fn draw_title(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let (state_color, state_label) = if app.is_running() {
        (Color::Green, app.status.state.to_string())
    } else {
        (Color::Yellow, app.status.state.to_string())
    };

    let title = Line::from(vec![
        Span::styled("Traffic Watch", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            format!("[{state_label}]"),
            Style::default().fg(state_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  cycles: {}  published: {}",
            app.status.cycles, app.status.published
        )),
    ]);

    let paragraph = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_statistics(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![
            Span::styled("Total incidents: ", bold),
            Span::raw(app.snapshot.total_incidents.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Last incident time: ", bold),
            Span::raw(
                app.snapshot
                    .last_incident_time
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
        ]),
        Line::from(vec![
            Span::styled("Most frequent location: ", bold),
            Span::raw(
                app.snapshot
                    .most_frequent_location()
                    .unwrap_or("N/A")
                    .to_string(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Incidents per hour: ", bold),
            Span::raw(app.per_hour_line()),
        ]),
    ];

    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Statistics"));
    frame.render_widget(paragraph, area);
}

fn draw_last_published(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let text = match (&app.status.last_published, &app.status.last_error) {
        (_, Some(error)) => format!("error: {error}"),
        (Some(summary), None) => summary.clone(),
        (None, None) => "Nothing published yet".to_string(),
    };

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Latest alert"));
    frame.render_widget(paragraph, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new("  s: start/stop   c: clear history   q: quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
