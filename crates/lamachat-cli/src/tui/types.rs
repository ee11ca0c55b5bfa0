use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

// ── chat message types ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub(super) enum ChatMsg {
    User(String),
    Assistant(String),
    Info(String),
    Error(String),
}

impl ChatMsg {
    pub(super) fn to_lines(&self) -> Vec<Line<'static>> {
        match self {
            ChatMsg::User(t) => vec![
                Line::from(vec![
                    Span::styled(
                        " you ",
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(t.clone(), Style::default().fg(Color::Cyan)),
                ]),
                Line::raw(""),
            ],
            ChatMsg::Assistant(t) => {
                let mut lines = vec![Line::from(Span::styled(
                    " ai ",
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))];
                for l in t.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {l}"),
                        Style::default().fg(Color::White),
                    )));
                }
                lines.push(Line::raw(""));
                lines
            }
            ChatMsg::Info(t) => vec![
                Line::from(Span::styled(
                    format!("  {t}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                Line::raw(""),
            ],
            ChatMsg::Error(t) => vec![
                Line::from(vec![
                    Span::styled(" error ", Style::default().fg(Color::White).bg(Color::Red)),
                    Span::raw("  "),
                    Span::styled(t.clone(), Style::default().fg(Color::Red)),
                ]),
                Line::raw(""),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn assistant_reply_keeps_every_line() {
        let lines = ChatMsg::Assistant("one\ntwo".into()).to_lines();
        let rendered: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(rendered, vec![" ai ", "  one", "  two", ""]);
    }

    #[test]
    fn error_line_carries_message() {
        let lines = ChatMsg::Error("request failed: refused".into()).to_lines();
        assert!(text(&lines[0]).contains("request failed: refused"));
    }
}
