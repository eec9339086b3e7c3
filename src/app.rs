use tokio::task::JoinHandle;

use crate::assistant::{AssistantClient, AssistantReply};
use crate::config::Config;
use crate::widget::{ChatWidget, WidgetOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetId {
    Assistant,
    Nova,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Log,
    Cards,
    QuickReplies,
    Input,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    pub client: AssistantClient,
    pub endpoint: String,

    // Two instances of the same widget contract: the page-body chat form
    // and the collapsible Nova overlay.
    pub assistant: ChatWidget,
    pub nova: ChatWidget,

    // At most one request in flight; its reply is routed back to the
    // widget that issued it.
    pub pending: Option<(WidgetId, JoinHandle<anyhow::Result<AssistantReply>>)>,

    pub status: Option<String>,
}

impl App {
    pub fn new() -> Self {
        let config = Config::load().unwrap_or_else(|_| Config::new());
        let endpoint = config.endpoint();
        let client = AssistantClient::new(&endpoint);

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,
            client,
            endpoint,
            assistant: ChatWidget::mount(WidgetOptions::bare_form()),
            nova: ChatWidget::mount(WidgetOptions::overlay()),
            pending: None,
            status: None,
        }
    }

    /// The Nova overlay captures input while it is open.
    pub fn active_id(&self) -> WidgetId {
        if self.nova.is_open() {
            WidgetId::Nova
        } else {
            WidgetId::Assistant
        }
    }

    pub fn widget(&self, id: WidgetId) -> &ChatWidget {
        match id {
            WidgetId::Assistant => &self.assistant,
            WidgetId::Nova => &self.nova,
        }
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> &mut ChatWidget {
        match id {
            WidgetId::Assistant => &mut self.assistant,
            WidgetId::Nova => &mut self.nova,
        }
    }

    pub fn active(&self) -> &ChatWidget {
        self.widget(self.active_id())
    }

    pub fn active_mut(&mut self) -> &mut ChatWidget {
        self.widget_mut(self.active_id())
    }

    /// Submit whatever is in the active widget's input line. A submit while
    /// any request is awaiting is ignored so replies land in call order.
    pub fn submit_active(&mut self) {
        if self.pending.is_some() {
            return;
        }

        let id = self.active_id();
        let query = match self.widget_mut(id).begin_submit() {
            Some(q) => q,
            None => return,
        };

        let client = self.client.clone();
        self.pending = Some((
            id,
            tokio::spawn(async move { client.ask(&query).await }),
        ));
    }

    /// Quick-reply path: place the label in the input and run the normal
    /// submit, exactly as the page does.
    pub fn submit_text(&mut self, text: &str) {
        let id = self.active_id();
        self.widget_mut(id).input = text.to_string();
        self.widget_mut(id).cursor = text.chars().count();
        self.submit_active();
    }

    /// Route a finished request's result back to the widget that issued it.
    /// Called from the tick handler; does nothing while the task runs.
    pub async fn poll_pending(&mut self) {
        let finished = matches!(&self.pending, Some((_, task)) if task.is_finished());
        if !finished {
            return;
        }

        if let Some((id, task)) = self.pending.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("assistant request panicked: {e}")),
            };
            self.widget_mut(id).finish_submit(result);
        }
    }

    /// Activating a card is a full page navigation: resolve against the
    /// site base and hand off to the system browser.
    pub fn open_selected_card(&mut self) {
        let url = self
            .active()
            .selected_card()
            .map(|card| self.client.page_url(&card.url));

        if let Some(url) = url {
            match open::that(&url) {
                Ok(()) => self.status = Some(format!("Opened {url}")),
                Err(_) => self.status = Some(format!("Could not open {url}")),
            }
        }
    }

    pub fn tick(&mut self) {
        self.assistant.tick_animation();
        self.nova.tick_animation();
    }
}
