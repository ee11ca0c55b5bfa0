use lamachat_core::ModelDescriptor;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::App;
use super::picker::Picker;

pub(super) const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(super) const LLAMA_AMBER: Color = Color::Rgb(255, 176, 0);

fn title(text: &str) -> Span<'_> {
    Span::styled(
        text,
        Style::default()
            .fg(LLAMA_AMBER)
            .add_modifier(Modifier::BOLD),
    )
}

pub(super) fn render_chat(frame: &mut Frame, app: &mut App, busy: bool, exit_command: &str) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // info box
            Constraint::Min(1),    // chat
            Constraint::Length(3), // input
        ])
        .split(area);

    // ── info box ──────────────────────────────────────────────────────────────
    let info_lines = vec![
        Line::from(vec![
            Span::styled("  model  ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                app.model.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("  enter send  ·  {exit_command} or esc pick another model  ·  ctrl+c quit"),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let info_widget = Paragraph::new(info_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(LLAMA_AMBER))
            .title(title(" lamachat ")),
    );
    frame.render_widget(info_widget, chunks[0]);

    // ── chat messages ─────────────────────────────────────────────────────────
    let mut lines: Vec<Line> = vec![Line::raw("")];
    for msg in &app.chat {
        lines.extend(msg.to_lines());
    }

    if busy {
        lines.push(Line::from(Span::styled(
            format!("  {} thinking…", SPINNER[app.spin_i % SPINNER.len()]),
            Style::default().fg(Color::Cyan),
        )));
    }

    let msg_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    format!(" chat with {} ", app.model),
                    Style::default().fg(Color::DarkGray),
                )),
        )
        .wrap(Wrap { trim: false });

    // Scroll clamping, on wrapped rows so long replies stay reachable.
    let rows = msg_widget.line_count(chunks[1].width.saturating_sub(2));
    let total = u16::try_from(rows).unwrap_or(u16::MAX);
    let view_h = chunks[1].height.saturating_sub(2);
    let max_scroll = total.saturating_sub(view_h);
    if app.scroll == u16::MAX {
        app.scroll = max_scroll;
    }
    app.scroll = app.scroll.min(max_scroll);

    frame.render_widget(msg_widget.scroll((app.scroll, 0)), chunks[1]);

    // ── input box ─────────────────────────────────────────────────────────────
    let border_col = if busy { Color::DarkGray } else { Color::Cyan };

    let before = &app.input[..app.cursor];
    let (cur_ch, after) = match app.input[app.cursor..].chars().next() {
        Some(ch) => {
            let end = app.cursor + ch.len_utf8();
            (ch.to_string(), app.input[end..].to_string())
        }
        None => (" ".to_string(), String::new()),
    };

    let input_line = Line::from(vec![
        Span::styled(before.to_string(), Style::default().fg(Color::White)),
        Span::styled(cur_ch, Style::default().fg(Color::Black).bg(Color::White)),
        Span::styled(after, Style::default().fg(Color::White)),
    ]);

    let input_title = if busy {
        " waiting for reply "
    } else {
        " message "
    };
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_col))
            .title(Span::styled(input_title, Style::default().fg(border_col))),
    );

    frame.render_widget(input_widget, chunks[2]);
}

pub(super) fn render_picker(frame: &mut Frame, models: &[ModelDescriptor], picker: &Picker) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);

    let lines: Vec<Line> = models
        .iter()
        .enumerate()
        .flat_map(|(i, model)| {
            let selected = i == picker.selected();
            let (style, desc_style) = if selected {
                let s = Style::default().fg(Color::Black).bg(Color::Cyan);
                (s.add_modifier(Modifier::BOLD), s)
            } else {
                (
                    Style::default().fg(Color::White),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let marker = if selected { "›" } else { " " };
            [
                Line::from(Span::styled(format!(" {marker} {}", model.name), style)),
                Line::from(Span::styled(format!("   {}", model.summary()), desc_style)),
                Line::raw(""),
            ]
        })
        .collect();

    // Three rows per model; keep the highlighted entry on screen.
    let view_h = chunks[0].height.saturating_sub(2);
    let row = (picker.selected() as u16).saturating_mul(3);
    let scroll = (row + 3).saturating_sub(view_h);

    let list = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(LLAMA_AMBER))
                .title(title(" Select an Ollama Model ")),
        )
        .scroll((scroll, 0));
    frame.render_widget(list, chunks[0]);

    let hint = Paragraph::new(Line::from(Span::styled(
        "  ↑/↓ move  ·  enter choose  ·  q quit",
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(hint, chunks[1]);
}
