use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, Focus};
use crate::conversation::Role;

/// Colors that differ between the dark and light themes. The dark set
/// matches a default terminal background; the light set picks colors that
/// stay readable on white.
struct Palette {
    accent: Color,
    assistant: Color,
    dim: Color,
    error: Color,
    select_bg: Color,
    select_fg: Color,
    header_bg: Color,
    bar_fg: Color,
    key_bg: Color,
    label_bg: Color,
}

fn palette(light_theme: bool) -> Palette {
    if light_theme {
        Palette {
            accent: Color::Blue,
            assistant: Color::Magenta,
            dim: Color::Gray,
            error: Color::Red,
            select_bg: Color::Cyan,
            select_fg: Color::Black,
            header_bg: Color::Gray,
            bar_fg: Color::Black,
            key_bg: Color::Gray,
            label_bg: Color::White,
        }
    } else {
        Palette {
            accent: Color::Cyan,
            assistant: Color::Yellow,
            dim: Color::DarkGray,
            error: Color::Red,
            select_bg: Color::Blue,
            select_fg: Color::White,
            header_bg: Color::DarkGray,
            bar_fg: Color::White,
            key_bg: Color::DarkGray,
            label_bg: Color::Black,
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = palette(app.light_theme);

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area, &palette);

    if app.sidebar_visible {
        let [sidebar_area, chat_area] = Layout::horizontal([
            Constraint::Length(26),
            Constraint::Min(0),
        ])
        .areas(body_area);

        app.sidebar_area = Some(sidebar_area);
        render_sidebar(app, frame, sidebar_area, &palette);
        render_chat_column(app, frame, chat_area, &palette);
    } else {
        app.sidebar_area = None;
        render_chat_column(app, frame, body_area, &palette);
    }

    render_footer(app, frame, footer_area, &palette);
}

fn render_header(frame: &mut Frame, area: Rect, palette: &Palette) {
    let title = Line::from(vec![
        Span::styled(" charla ", Style::default().fg(palette.accent).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.bar_fg),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(palette.header_bg));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let sidebar_focused = app.focus == Focus::Sidebar;
    let border_color = if sidebar_focused { palette.accent } else { palette.dim };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chats ({}) ", app.store.conversations().len()));

    let items: Vec<ListItem> = app
        .store
        .conversations()
        .iter()
        .map(|c| {
            let marker = if c.active { "* " } else { "  " };
            ListItem::new(format!(" {}{} ", marker, c.title))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.select_bg)
                .fg(palette.select_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_chat_column(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // Chat history on top, input at the bottom
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store history area and dimensions for mouse hit-testing and scroll
    // calculations (inner size minus borders)
    app.chat_area = Some(history_area);
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);

    render_history(app, frame, history_area, palette);
    render_input(app, frame, input_area, palette);
}

fn render_history(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let in_flight = app.turn.in_flight();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.dim))
        .title(format!(" {} ", app.store.active_title()));

    let chat_text = if app.store.messages().is_empty() && !in_flight && app.error.is_none() {
        Text::from(Span::styled(
            "Type a message...",
            Style::default().fg(palette.dim),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.store.messages() {
            let (sender, sender_color) = match msg.role {
                Role::User => (app.username.as_str(), palette.accent),
                Role::Assistant => ("AI", palette.assistant),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}:", sender),
                    Style::default().fg(sender_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(
                    msg.timestamp.format("%H:%M:%S").to_string(),
                    Style::default().fg(palette.dim),
                ),
            ]));
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if in_flight {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default()
                    .fg(palette.assistant)
                    .add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
            )));
        }

        if let Some(error) = &app.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let input_focused = app.focus == Focus::Input;
    let in_flight = app.turn.in_flight();

    let border_color = if input_focused && !in_flight {
        palette.accent
    } else {
        palette.dim
    };

    let title = if in_flight { " Message (waiting) " } else { " Message " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Newlines occupy one cell so cursor columns track char positions
    let visible_text: String = app
        .input
        .chars()
        .map(|c| if c == '\n' { '↵' } else { c })
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.accent))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor while the input can actually accept a submission
    if input_focused && !in_flight {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let mode_style = match app.focus {
        Focus::Sidebar => Style::default().bg(palette.select_bg).fg(palette.select_fg),
        Focus::Input => Style::default().bg(palette.assistant).fg(Color::Black),
    };

    let mode_text = match app.focus {
        Focus::Sidebar => " CHATS ",
        Focus::Input => " CHAT ",
    };

    let key_style = Style::default().bg(palette.key_bg).fg(palette.bar_fg);
    let label_style = Style::default().bg(palette.label_bg).fg(palette.bar_fg);

    let hints = match app.focus {
        Focus::Input => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" chats ", label_style),
            Span::styled(" ^N ", key_style),
            Span::styled(" new ", label_style),
            Span::styled(" ^T ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" ^B ", key_style),
            Span::styled(" sidebar ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        Focus::Sidebar => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" move ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" open ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" message ", label_style),
            Span::styled(" ^N ", key_style),
            Span::styled(" new ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(palette.label_bg));
    frame.render_widget(footer, area);
}
