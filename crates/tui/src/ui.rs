use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use paintbot_core::types::{ColorName, WorkerState};
use crate::App;

fn swatch(color: ColorName) -> Color {
    match color {
        ColorName::Red => Color::Red,
        ColorName::Green => Color::Green,
        ColorName::Blue => Color::Blue,
        ColorName::Yellow => Color::Yellow,
        ColorName::Black => Color::Black,
        ColorName::White => Color::White,
        ColorName::Orange => Color::Rgb(255, 140, 0),
        ColorName::Purple => Color::Magenta,
        ColorName::Pink => Color::LightMagenta,
        ColorName::Brown => Color::Rgb(139, 69, 19),
        ColorName::Gray => Color::Gray,
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let status = app.run_status();
    let (banner_label, banner_bg) = match status.state {
        WorkerState::Running => ("RUNNING".to_string(), Color::Yellow),
        WorkerState::Stopped => ("STOPPED".to_string(), Color::Red),
        WorkerState::Idle => match &status.last_result {
            Some(r) if r.success => (format!("IDLE  last: {}", r.message), Color::Green),
            Some(r) => (format!("IDLE  last: {}", r.message), Color::Red),
            None => ("IDLE (Enter to run)".to_string(), Color::Cyan),
        },
    };

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            key(" Up"),
            Span::raw("/"),
            key("Down"),
            Span::raw(" color, "),
            key("Tab"),
            Span::raw(" close after, "),
            key("Enter"),
            Span::raw(" run, "),
            key("F2"),
            Span::raw(" logs, "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Text: ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.text.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
            Span::styled("_", Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(""),
    ];

    for (i, color) in ColorName::ALL.iter().enumerate() {
        let is_selected = i == app.selected;
        let prefix = if is_selected { " > " } else { "   " };
        let name_style = if is_selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled("██", Style::default().fg(swatch(*color))),
            Span::raw(" "),
            Span::styled(color.as_str(), name_style),
        ]));
    }

    lines.push(Line::from(""));
    let checkbox = if app.close_after { "[x]" } else { "[ ]" };
    lines.push(Line::from(vec![
        Span::raw(" "),
        Span::styled(checkbox, Style::default().fg(Color::Cyan)),
        Span::raw(" close Paint afterwards"),
    ]));
    if status.runs > 0 {
        lines.push(Line::from(Span::styled(
            format!(" {} plan(s) run", status.runs),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    // Full-width centered banner
    let banner_width = left_chunks[0].width as usize;
    let label: String = banner_label.chars().take(banner_width).collect();
    let pad_total = banner_width.saturating_sub(label.chars().count());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(form, left_chunks[1]);

    // -- Right panel: logs --
    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end]
            .iter()
            .map(|m| parse_log_line(m))
            .collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(preview) = &app.preview {
        preview.render(f);
    }
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let prefix_color = match color_idx {
        1 => Color::DarkGray,     // COLOR_GRAY
        2 => Color::LightBlue,    // COLOR_BLUE
        3 => Color::LightGreen,   // COLOR_GREEN
        4 => Color::LightMagenta, // COLOR_MAGENTA
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        "DEBUG" => spans.push(Span::styled("debug ", Style::default().fg(Color::DarkGray))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(prefix_color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(prefix_color)));

    Line::from(spans)
}
