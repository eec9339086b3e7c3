use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, InputMode, WidgetId};
use crate::widget::{ChatRole, ChatWidget, LogEntry};

/// Parse a line of text and convert **bold** markup to styled spans.
/// Assistant answers may carry simple emphasis; anything else renders
/// literally.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' {
            // Check for ** (bold)
            if chars.peek().map(|(_, c)| *c) == Some('*') {
                chars.next();

                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }

                // Find closing **
                let mut bold_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                        chars.next();
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            } else {
                current_text.push(c);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, body_area, WidgetId::Assistant);
    render_footer(app, frame, footer_area);

    if app.nova.is_open() {
        render_nova_overlay(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Nova ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" {} ", app.endpoint),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Green),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            if app.focus == FocusPane::Cards {
                hints.extend(vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" open link ", label_style),
                ]);
            }
            if app.focus == FocusPane::QuickReplies {
                hints.extend(vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" send reply ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" n ", key_style),
                Span::styled(
                    if app.nova.is_open() { " close Nova " } else { " Nova " },
                    label_style,
                ),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

/// Render one widget instance into `area`: message log on top, quick-reply
/// panel when the instance has one, input box at the bottom.
fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, id: WidgetId) {
    let is_active = app.active_id() == id;
    let focus = app.focus;
    let input_mode = app.input_mode;
    let widget = app.widget_mut(id);

    let quick_height = if widget.quick_replies.is_empty() {
        0
    } else {
        (widget.quick_replies.len().min(4) + 2) as u16
    };

    let [log_area, quick_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(quick_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store log dimensions for scroll calculations (inner size minus borders)
    widget.log_height = log_area.height.saturating_sub(2);
    widget.log_width = log_area.width.saturating_sub(2);

    let log_focused = is_active && focus == FocusPane::Log;
    let cards_focused = is_active && focus == FocusPane::Cards;
    render_log(widget, frame, log_area, log_focused, cards_focused);

    if quick_height > 0 {
        render_quick_replies(
            widget,
            frame,
            quick_area,
            is_active && focus == FocusPane::QuickReplies,
        );
    }

    render_input(widget, frame, input_area, is_active, focus, input_mode, id);
}

fn render_log(
    widget: &ChatWidget,
    frame: &mut Frame,
    area: Rect,
    log_focused: bool,
    cards_focused: bool,
) {
    let border_color = if log_focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    let text = if widget.entries.is_empty() && !widget.typing {
        Text::from(Span::styled(
            "Ask about rooms, bookings, or the waitlist...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        let mut card_idx = 0usize;
        let selected_card = widget.card_state.selected();

        for entry in &widget.entries {
            match entry {
                LogEntry::Message(msg) => match msg.role {
                    ChatRole::User => {
                        lines.push(Line::from(Span::styled(
                            "You:",
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                        )));
                        lines.push(Line::from(msg.text.clone()));
                        lines.push(Line::default());
                    }
                    ChatRole::Assistant => {
                        lines.push(Line::from(Span::styled(
                            "Nova:",
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        )));
                        for line in msg.text.lines() {
                            lines.push(parse_markdown_line(line));
                        }
                        lines.push(Line::default());
                    }
                },
                LogEntry::Card { card, primary } => {
                    let marker = if *primary { "* " } else { "> " };
                    let mut style = if *primary {
                        Style::default()
                            .fg(Color::Magenta)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Blue)
                    };
                    if cards_focused && selected_card == Some(card_idx) {
                        style = style.bg(Color::Blue).fg(Color::White);
                    }
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", marker, card.label),
                        style,
                    )));
                    if !card.description.is_empty() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}", card.description),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                    card_idx += 1;
                }
            }
        }

        if widget.typing {
            lines.push(Line::from(Span::styled(
                "Nova:",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((widget.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Typing{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let log = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((widget.log_scroll, 0));

    frame.render_widget(log, area);
}

fn render_quick_replies(widget: &mut ChatWidget, frame: &mut Frame, area: Rect, focused: bool) {
    let border_color = if focused { Color::Cyan } else { Color::Magenta };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Quick replies (1-4 or Enter) ");

    let items: Vec<ListItem> = widget
        .quick_replies
        .iter()
        .enumerate()
        .map(|(i, label)| ListItem::new(format!(" {}. {} ", i + 1, label)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut widget.quick_state);
}

fn render_input(
    widget: &ChatWidget,
    frame: &mut Frame,
    area: Rect,
    is_active: bool,
    focus: FocusPane,
    input_mode: InputMode,
    id: WidgetId,
) {
    let editing = is_active && input_mode == InputMode::Editing;
    let border_color = if editing || (is_active && focus == FocusPane::Input) {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = match id {
        WidgetId::Assistant => " Ask the assistant ",
        WidgetId::Nova => " Ask Nova ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor visible in a narrow box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = widget.cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = widget
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// The Nova overlay pops over the page like the site's collapsible widget.
fn render_nova_overlay(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_width = (area.width * 7 / 10).min(area.width.saturating_sub(4)).max(30);
    let popup_height = (area.height * 8 / 10).min(area.height.saturating_sub(2)).max(12);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Nova (Esc to close) ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    render_chat(app, frame, inner, WidgetId::Nova);
}
