use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{debug, warn};
use crate::client::InferenceClient;
use crate::config::Config;
use crate::conversation::{ConversationStore, Role};
use crate::turn::{TurnCycle, TurnOutcome, TurnRequest};

/// The one error message shown for a failed turn. Network errors, bad
/// statuses, and malformed bodies all read the same to the user; the
/// distinction goes to the log.
pub const SEND_ERROR: &str = "Could not reach the assistant. Check the endpoint and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,

    // Conversation state
    pub store: ConversationStore,
    pub turn: TurnCycle,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in characters
    pub error: Option<String>,

    // Presentation state
    pub light_theme: bool,
    pub sidebar_visible: bool,
    pub sidebar_state: ListState,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Session settings
    pub username: String,
    pub client: InferenceClient,
}

impl App {
    pub fn new(endpoint: &str, username: String, light_theme: bool) -> Self {
        let mut sidebar_state = ListState::default();
        sidebar_state.select(Some(0));

        Self {
            should_quit: false,
            focus: Focus::Input,

            store: ConversationStore::new(),
            turn: TurnCycle::new(),

            input: String::new(),
            input_cursor: 0,
            error: None,

            light_theme,
            sidebar_visible: true,
            sidebar_state,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            sidebar_area: None,
            chat_area: None,

            username,
            client: InferenceClient::new(endpoint),
        }
    }

    // Turn lifecycle

    /// Validates the input buffer and stages a turn: captures the payload,
    /// appends the user message, clears the buffer. Returns None (and does
    /// nothing) for blank input or while a round trip is outstanding.
    pub fn prepare_turn(&mut self) -> Option<TurnRequest> {
        if self.input.trim().is_empty() || self.turn.in_flight() {
            return None;
        }

        self.error = None;

        let input = self.input.clone();

        // History and the first-exchange flag are captured before the
        // append: the payload carries prior turns only, and the rename
        // decision is not confused by the message just added.
        let request = TurnRequest {
            conversation: self.store.active_id(),
            history: self.store.history_pairs(),
            first_exchange: self.store.messages().is_empty(),
            input: input.clone(),
        };

        self.store.append_message(Role::User, &input);
        self.input.clear();
        self.input_cursor = 0;
        self.scroll_chat_to_bottom();

        Some(request)
    }

    /// Submits the input buffer as a new turn against the real endpoint.
    pub fn submit(&mut self) {
        if let Some(request) = self.prepare_turn() {
            debug!(
                "submitting turn for conversation {} with {} prior pairs",
                request.conversation,
                request.history.len()
            );
            let client = self.client.clone();
            let input = request.input.clone();
            let history = request.history.clone();
            let task = tokio::spawn(async move { client.predict(&input, history).await });
            self.turn.begin(request, task);
        }
    }

    /// Called on every tick; folds a finished round trip back into state.
    pub async fn poll_turn(&mut self) {
        if let Some((request, outcome)) = self.turn.try_finish().await {
            self.finish_turn(request, outcome);
        }
    }

    fn finish_turn(&mut self, request: TurnRequest, outcome: TurnOutcome) {
        match outcome {
            TurnOutcome::Reply(reply) => {
                self.store
                    .append_to(request.conversation, Role::Assistant, &reply);
                if request.first_exchange {
                    self.store
                        .rename_conversation(request.conversation, &request.input);
                }
            }
            TurnOutcome::Error(detail) => {
                warn!("turn failed: {}", detail);
                self.error = Some(SEND_ERROR.to_string());
            }
        }

        debug!("turn finished in phase {:?}", self.turn.phase());

        if request.conversation == self.store.active_id() {
            self.scroll_chat_to_bottom();
        }
    }

    // Conversation actions

    pub fn new_conversation(&mut self) {
        self.store.create_conversation();
        self.chat_scroll = 0;
        self.select_active_in_sidebar();
    }

    pub fn activate_selected(&mut self) {
        if let Some(i) = self.sidebar_state.selected() {
            if let Some(conversation) = self.store.conversations().get(i) {
                let id = conversation.id;
                self.store.activate(id);
                self.chat_scroll = 0;
                self.scroll_chat_to_bottom();
            }
        }
    }

    fn select_active_in_sidebar(&mut self) {
        let active = self.store.active_id();
        if let Some(i) = self
            .store
            .conversations()
            .iter()
            .position(|c| c.id == active)
        {
            self.sidebar_state.select(Some(i));
        }
    }

    // Sidebar navigation

    pub fn sidebar_nav_down(&mut self) {
        let len = self.store.conversations().len();
        if len > 0 {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some(i.saturating_sub(1)));
    }

    // Presentation toggles

    pub fn toggle_theme(&mut self) {
        self.light_theme = !self.light_theme;
        // Remember the choice for the next session
        let _ = Config::save_light_theme(self.light_theme);
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
        if !self.sidebar_visible && self.focus == Focus::Sidebar {
            self.focus = Focus::Input;
        }
    }

    // Chat scrolling

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_page_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height.max(1));
    }

    pub fn scroll_chat_page_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(self.chat_height.max(1));
    }

    /// Scroll chat so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.store.messages() {
            total_lines += 1; // Sender line
            // Calculate wrapped lines for each line of content
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.turn.in_flight() {
            total_lines += 2; // "AI:" + "Thinking..."
        }
        if self.error.is_some() {
            total_lines += 1;
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.turn.in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tokio::task::JoinHandle;

    fn test_app() -> App {
        App::new("http://localhost:7860/api/predict", "Anonymous".to_string(), false)
    }

    fn type_input(app: &mut App, text: &str) {
        app.input = text.to_string();
        app.input_cursor = text.chars().count();
    }

    fn fake_reply(reply: &str) -> JoinHandle<anyhow::Result<String>> {
        let reply = reply.to_string();
        tokio::spawn(async move { Ok(reply) })
    }

    fn fake_failure() -> JoinHandle<anyhow::Result<String>> {
        tokio::spawn(async { Err(anyhow!("connection refused")) })
    }

    fn fake_pending() -> JoinHandle<anyhow::Result<String>> {
        tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(String::new())
        })
    }

    async fn drive_turn(app: &mut App) {
        while app.turn.in_flight() {
            app.poll_turn().await;
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_prepare_turn_appends_exactly_one_user_message() {
        let mut app = test_app();
        type_input(&mut app, "Hello");

        let request = app.prepare_turn();

        assert!(request.is_some());
        assert_eq!(app.store.messages().len(), 1);
        assert_eq!(app.store.messages()[0].role, Role::User);
        assert_eq!(app.store.messages()[0].content, "Hello");
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn test_prepare_turn_refuses_blank_input() {
        let mut app = test_app();
        type_input(&mut app, "   \n ");

        assert!(app.prepare_turn().is_none());
        assert!(app.store.messages().is_empty());
    }

    #[test]
    fn test_payload_excludes_the_message_being_sent() {
        let mut app = test_app();
        type_input(&mut app, "Hello");

        let request = app.prepare_turn().unwrap();

        assert_eq!(request.input, "Hello");
        assert!(request.history.is_empty());
        assert!(request.first_exchange);
    }

    #[tokio::test]
    async fn test_second_submit_is_noop_while_in_flight() {
        let mut app = test_app();
        type_input(&mut app, "first");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_pending());

        type_input(&mut app, "second");

        assert!(app.prepare_turn().is_none());
        assert_eq!(app.store.messages().len(), 1);
        assert_eq!(app.input, "second");
    }

    #[tokio::test]
    async fn test_successful_turn_appends_reply_and_renames() {
        let mut app = test_app();
        type_input(&mut app, "Hello");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_reply("Hi there"));

        drive_turn(&mut app).await;

        let messages = app.store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hi there");
        assert!(app.error.is_none());
        assert!(!app.turn.in_flight());
        assert_eq!(app.store.active_title(), "Hello...");
    }

    #[tokio::test]
    async fn test_failed_turn_sets_error_and_keeps_user_message() {
        let mut app = test_app();
        type_input(&mut app, "Hello");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_failure());

        drive_turn(&mut app).await;

        assert_eq!(app.store.messages().len(), 1);
        assert_eq!(app.store.messages()[0].role, Role::User);
        assert_eq!(app.error.as_deref(), Some(SEND_ERROR));
        assert!(!app.turn.in_flight());
    }

    #[tokio::test]
    async fn test_error_clears_on_next_submit() {
        let mut app = test_app();
        type_input(&mut app, "first");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_failure());
        drive_turn(&mut app).await;
        assert!(app.error.is_some());

        type_input(&mut app, "second");
        app.prepare_turn().unwrap();

        assert!(app.error.is_none());
    }

    #[tokio::test]
    async fn test_rename_fires_only_on_first_exchange() {
        let mut app = test_app();
        type_input(&mut app, "Hello");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_reply("Hi"));
        drive_turn(&mut app).await;

        type_input(&mut app, "And another thing entirely");
        let request = app.prepare_turn().unwrap();
        assert!(!request.first_exchange);
        app.turn.begin(request, fake_reply("Sure"));
        drive_turn(&mut app).await;

        assert_eq!(app.store.active_title(), "Hello...");
    }

    #[tokio::test]
    async fn test_second_turn_payload_carries_prior_history() {
        let mut app = test_app();
        type_input(&mut app, "one");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_reply("first reply"));
        drive_turn(&mut app).await;

        type_input(&mut app, "two");
        let request = app.prepare_turn().unwrap();

        assert_eq!(
            request.history,
            vec![("one".to_string(), "first reply".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reply_lands_in_originating_conversation() {
        let mut app = test_app();
        let first = app.store.active_id();
        type_input(&mut app, "Hello");
        let request = app.prepare_turn().unwrap();
        app.turn.begin(request, fake_reply("Hi there"));

        // Switch away while the request is still in flight
        app.new_conversation();
        drive_turn(&mut app).await;

        assert!(app.store.messages().is_empty());
        let original = app.store.conversation(first).unwrap();
        assert_eq!(original.messages.len(), 2);
        assert_eq!(original.messages[1].content, "Hi there");
        assert_eq!(original.title, "Hello...");
    }

    #[test]
    fn test_new_conversation_starts_empty_and_active() {
        let mut app = test_app();
        type_input(&mut app, "Hello");
        app.prepare_turn();
        let first = app.store.active_id();

        app.new_conversation();

        assert_ne!(app.store.active_id(), first);
        assert!(app.store.messages().is_empty());
        let active: Vec<_> = app
            .store
            .conversations()
            .iter()
            .filter(|c| c.active)
            .collect();
        assert_eq!(active.len(), 1);
    }
}
