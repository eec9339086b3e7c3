use ratatui::widgets::ListState;

use crate::assistant::{AssistantReply, LinkCard};

/// Quick replies shown at mount and whenever the server supplies none.
pub const DEFAULT_QUICK_REPLIES: [&str; 4] = [
    "Show menu",
    "How do I book a resource?",
    "Waitlist help",
    "Contact admin",
];

/// Shown when a reply arrives without an answer.
pub const FALLBACK_ANSWER: &str = "Let me know how I can help!";

/// Shown for any transport or parse failure. The widget stays usable.
pub const SERVICE_ERROR: &str =
    "I ran into an issue reaching the assistant service. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// One item in the append-only message log. Cards are logged right after
/// the assistant message they arrived with, so ordering survives scrolling.
#[derive(Debug, Clone)]
pub enum LogEntry {
    Message(ChatMessage),
    Card { card: LinkCard, primary: bool },
}

/// Capabilities detected at mount time. The page hosts two instances of the
/// same widget: a bare chat form (no toggle, no quick-reply panel) and the
/// Nova overlay (both present). Operations on a missing capability no-op.
#[derive(Debug, Clone, Copy)]
pub struct WidgetOptions {
    pub collapsible: bool,
    pub has_quick_replies: bool,
}

impl WidgetOptions {
    pub fn bare_form() -> Self {
        Self {
            collapsible: false,
            has_quick_replies: false,
        }
    }

    pub fn overlay() -> Self {
        Self {
            collapsible: true,
            has_quick_replies: true,
        }
    }
}

/// One chat widget instance: visibility flag, append-only log, input line,
/// quick-reply panel, and a typing indicator that doubles as the
/// one-request-in-flight guard.
pub struct ChatWidget {
    options: WidgetOptions,
    open: bool,

    pub entries: Vec<LogEntry>,
    pub typing: bool,

    pub input: String,
    pub cursor: usize,

    pub quick_replies: Vec<String>,
    pub quick_state: ListState,
    pub card_state: ListState,

    // Log viewport (updated during render, used for scroll-to-bottom)
    pub log_scroll: u16,
    pub log_height: u16,
    pub log_width: u16,

    pub animation_frame: u8,
}

impl ChatWidget {
    /// Mount one widget instance. A collapsible instance starts collapsed,
    /// matching the page; a bare form is always visible.
    pub fn mount(options: WidgetOptions) -> Self {
        let quick_replies: Vec<String> = if options.has_quick_replies {
            DEFAULT_QUICK_REPLIES.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        let mut quick_state = ListState::default();
        if !quick_replies.is_empty() {
            quick_state.select(Some(0));
        }

        Self {
            options,
            open: !options.collapsible,
            entries: Vec::new(),
            typing: false,
            input: String::new(),
            cursor: 0,
            quick_replies,
            quick_state,
            card_state: ListState::default(),
            log_scroll: 0,
            log_height: 0,
            log_width: 0,
            animation_frame: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle_open(&mut self) {
        if self.options.collapsible {
            self.open = !self.open;
        }
    }

    pub fn close(&mut self) {
        if self.options.collapsible {
            self.open = false;
        }
    }

    /// Synchronous half of a submission: trim, append the user message,
    /// clear the input, raise the typing indicator, and hand back the query
    /// to send. Empty input is a silent no-op; so is a submit while a
    /// request is already awaiting, which keeps bubbles in call order.
    pub fn begin_submit(&mut self) -> Option<String> {
        let query = self.input.trim().to_string();
        if query.is_empty() || self.typing {
            return None;
        }

        self.entries.push(LogEntry::Message(ChatMessage {
            role: ChatRole::User,
            text: query.clone(),
        }));
        self.input.clear();
        self.cursor = 0;
        self.typing = true;
        self.scroll_to_bottom();
        Some(query)
    }

    /// Completion half: drop the typing indicator and render the outcome.
    /// Transport failures, error statuses, and malformed bodies all arrive
    /// here as `Err` and collapse into one fixed assistant message.
    pub fn finish_submit(&mut self, result: anyhow::Result<AssistantReply>) {
        self.typing = false;
        self.animation_frame = 0;

        match result {
            Ok(reply) => {
                let answer = reply
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_ANSWER.to_string());
                self.entries.push(LogEntry::Message(ChatMessage {
                    role: ChatRole::Assistant,
                    text: answer,
                }));

                if let Some(card) = reply.primary_link {
                    self.entries.push(LogEntry::Card { card, primary: true });
                }
                for card in reply.suggestions {
                    self.entries.push(LogEntry::Card {
                        card,
                        primary: false,
                    });
                }

                if self.options.has_quick_replies {
                    self.quick_replies = if reply.quick_replies.is_empty() {
                        DEFAULT_QUICK_REPLIES.iter().map(|s| s.to_string()).collect()
                    } else {
                        reply.quick_replies
                    };
                    // Keep the selection in range after the panel changes
                    if let Some(i) = self.quick_state.selected() {
                        if i >= self.quick_replies.len() {
                            self.quick_state
                                .select(Some(self.quick_replies.len().saturating_sub(1)));
                        }
                    }
                }

                if self.cards_len() > 0 && self.card_state.selected().is_none() {
                    self.card_state.select(Some(0));
                }
            }
            Err(_) => {
                self.entries.push(LogEntry::Message(ChatMessage {
                    role: ChatRole::Assistant,
                    text: SERVICE_ERROR.to_string(),
                }));
            }
        }

        self.scroll_to_bottom();
    }

    /// Label of the selected quick reply, to be fed back through the submit
    /// path as if the user had typed it.
    pub fn quick_reply(&self, index: usize) -> Option<&str> {
        self.quick_replies.get(index).map(String::as_str)
    }

    // Cards are addressed by their position among card entries, in log order.
    pub fn cards_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, LogEntry::Card { .. }))
            .count()
    }

    pub fn card_at(&self, index: usize) -> Option<&LinkCard> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::Card { card, .. } => Some(card),
                LogEntry::Message(_) => None,
            })
            .nth(index)
    }

    pub fn selected_card(&self) -> Option<&LinkCard> {
        self.card_state.selected().and_then(|i| self.card_at(i))
    }

    pub fn card_nav_down(&mut self) {
        let len = self.cards_len();
        if len > 0 {
            let i = self.card_state.selected().unwrap_or(0);
            self.card_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn card_nav_up(&mut self) {
        let i = self.card_state.selected().unwrap_or(0);
        self.card_state.select(Some(i.saturating_sub(1)));
    }

    pub fn quick_nav_down(&mut self) {
        let len = self.quick_replies.len();
        if len > 0 {
            let i = self.quick_state.selected().unwrap_or(0);
            self.quick_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn quick_nav_up(&mut self) {
        let i = self.quick_state.selected().unwrap_or(0);
        self.quick_state.select(Some(i.saturating_sub(1)));
    }

    /// Tick animation frame while a request is awaiting (called by Tick)
    pub fn tick_animation(&mut self) {
        if self.typing {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.log_scroll = self.log_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.log_scroll = self.log_scroll.saturating_add(1);
    }

    /// Scroll the log so the newest bubble (or the typing indicator) is
    /// visible. Wrap math mirrors the paragraph renderer.
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.log_width > 0 {
            self.log_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for entry in &self.entries {
            match entry {
                LogEntry::Message(msg) => {
                    total_lines += 1; // role line
                    for line in msg.text.lines() {
                        // Character count, not byte length, for UTF-8 text
                        let char_count = line.chars().count();
                        if char_count == 0 {
                            total_lines += 1;
                        } else {
                            total_lines += ((char_count / wrap_width) + 1) as u16;
                        }
                    }
                    total_lines += 1; // blank line after message
                }
                LogEntry::Card { card, .. } => {
                    // Label line plus a description line when there is one
                    total_lines += 1;
                    if !card.description.is_empty() {
                        total_lines += 1;
                    }
                }
            }
        }

        if self.typing {
            total_lines += 2; // role line + ellipsis line
        }

        let visible_height = if self.log_height > 0 {
            self.log_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.log_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.log_scroll = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn overlay() -> ChatWidget {
        ChatWidget::mount(WidgetOptions::overlay())
    }

    fn user_texts(widget: &ChatWidget) -> Vec<&str> {
        widget
            .entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::Message(m) if m.role == ChatRole::User => Some(m.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn assistant_texts(widget: &ChatWidget) -> Vec<&str> {
        widget
            .entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::Message(m) if m.role == ChatRole::Assistant => Some(m.text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_submit_appends_one_user_message() {
        let mut widget = overlay();
        widget.input = "  room for 10  ".to_string();

        let query = widget.begin_submit();

        assert_eq!(query.as_deref(), Some("room for 10"));
        assert_eq!(user_texts(&widget), vec!["room for 10"]);
        assert!(widget.typing);
        assert!(widget.input.is_empty());
        assert_eq!(widget.cursor, 0);
    }

    #[test]
    fn test_empty_input_is_silent_noop() {
        let mut widget = overlay();
        for raw in ["", "   ", "\t\n"] {
            widget.input = raw.to_string();
            assert!(widget.begin_submit().is_none());
        }
        assert!(widget.entries.is_empty());
        assert!(!widget.typing);
    }

    #[test]
    fn test_submit_ignored_while_awaiting() {
        let mut widget = overlay();
        widget.input = "first".to_string();
        assert!(widget.begin_submit().is_some());

        widget.input = "second".to_string();
        assert!(widget.begin_submit().is_none());
        assert_eq!(user_texts(&widget), vec!["first"]);
        // Ignored submit keeps its input so nothing typed is lost
        assert_eq!(widget.input, "second");
    }

    #[test]
    fn test_success_renders_answer_and_clears_typing() {
        let mut widget = overlay();
        widget.input = "any rooms?".to_string();
        widget.begin_submit();

        widget.finish_submit(Ok(AssistantReply {
            answer: Some("Try Room 4B".to_string()),
            ..Default::default()
        }));

        assert!(!widget.typing);
        assert_eq!(assistant_texts(&widget), vec!["Try Room 4B"]);
    }

    #[test]
    fn test_missing_answer_uses_fallback() {
        let mut widget = overlay();
        widget.input = "hello".to_string();
        widget.begin_submit();

        widget.finish_submit(Ok(AssistantReply::default()));
        assert_eq!(assistant_texts(&widget), vec![FALLBACK_ANSWER]);

        widget.input = "hello again".to_string();
        widget.begin_submit();
        widget.finish_submit(Ok(AssistantReply {
            answer: Some("   ".to_string()),
            ..Default::default()
        }));
        assert_eq!(assistant_texts(&widget), vec![FALLBACK_ANSWER, FALLBACK_ANSWER]);
    }

    #[test]
    fn test_user_message_immediately_precedes_reply() {
        let mut widget = overlay();
        widget.input = "q".to_string();
        widget.begin_submit();
        widget.finish_submit(Ok(AssistantReply {
            answer: Some("a".to_string()),
            ..Default::default()
        }));

        let roles: Vec<ChatRole> = widget
            .entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::Message(m) => Some(m.role),
                _ => None,
            })
            .collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
    }

    #[test]
    fn test_primary_link_precedes_suggestions() {
        let mut widget = overlay();
        widget.input = "book something".to_string();
        widget.begin_submit();

        widget.finish_submit(Ok(AssistantReply {
            answer: Some("Here you go.".to_string()),
            primary_link: Some(LinkCard {
                label: "Open My Bookings".to_string(),
                description: String::new(),
                url: "/bookings/".to_string(),
            }),
            suggestions: vec![LinkCard {
                label: "A".to_string(),
                description: "d".to_string(),
                url: "/a".to_string(),
            }],
            ..Default::default()
        }));

        assert_eq!(widget.cards_len(), 2);
        let primary = widget.card_at(0).expect("primary card");
        assert_eq!(primary.label, "Open My Bookings");
        let suggestion = widget.card_at(1).expect("suggestion card");
        assert_eq!(suggestion.label, "A");
        assert_eq!(suggestion.description, "d");
        assert_eq!(suggestion.url, "/a");

        // Primary card carries the prominent flag in the log
        match &widget.entries[2] {
            LogEntry::Card { primary, .. } => assert!(*primary),
            other => panic!("expected card entry, got {:?}", other),
        }
    }

    #[test]
    fn test_quick_replies_replaced_or_defaulted() {
        let defaults: Vec<String> = DEFAULT_QUICK_REPLIES.iter().map(|s| s.to_string()).collect();
        let mut widget = overlay();
        assert_eq!(widget.quick_replies, defaults);

        widget.input = "waitlist".to_string();
        widget.begin_submit();
        widget.finish_submit(Ok(AssistantReply {
            answer: Some("ok".to_string()),
            quick_replies: vec!["Join waitlist".to_string(), "Leave waitlist".to_string()],
            ..Default::default()
        }));
        assert_eq!(widget.quick_replies.len(), 2);
        assert_eq!(widget.quick_reply(0), Some("Join waitlist"));

        widget.input = "thanks".to_string();
        widget.begin_submit();
        widget.finish_submit(Ok(AssistantReply {
            answer: Some("ok".to_string()),
            ..Default::default()
        }));
        assert_eq!(widget.quick_replies, defaults);
    }

    #[test]
    fn test_bare_form_has_no_quick_reply_panel() {
        let mut widget = ChatWidget::mount(WidgetOptions::bare_form());
        assert!(widget.quick_replies.is_empty());

        widget.input = "hi".to_string();
        widget.begin_submit();
        widget.finish_submit(Ok(AssistantReply {
            answer: Some("hello".to_string()),
            quick_replies: vec!["ignored".to_string()],
            ..Default::default()
        }));
        assert!(widget.quick_replies.is_empty());
    }

    #[test]
    fn test_failure_appends_fixed_error_message() {
        let mut widget = overlay();
        widget.input = "hello".to_string();
        widget.begin_submit();

        widget.finish_submit(Err(anyhow!("connection refused")));

        assert!(!widget.typing);
        assert_eq!(assistant_texts(&widget), vec![SERVICE_ERROR]);

        // Widget stays usable for the next submission
        widget.input = "retry".to_string();
        assert!(widget.begin_submit().is_some());
    }

    #[test]
    fn test_toggle_twice_restores_visibility() {
        let mut widget = overlay();
        let initial = widget.is_open();
        widget.toggle_open();
        widget.toggle_open();
        assert_eq!(widget.is_open(), initial);

        widget.toggle_open();
        assert!(widget.is_open());
        widget.close();
        widget.close();
        assert!(!widget.is_open());
    }

    #[test]
    fn test_bare_form_ignores_toggle() {
        let mut widget = ChatWidget::mount(WidgetOptions::bare_form());
        assert!(widget.is_open());
        widget.toggle_open();
        assert!(widget.is_open());
        widget.close();
        assert!(widget.is_open());
    }

    #[test]
    fn test_quick_reply_lookup() {
        let widget = overlay();
        assert_eq!(widget.quick_reply(2), Some("Waitlist help"));
        assert_eq!(widget.quick_reply(99), None);
    }
}
