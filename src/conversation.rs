use chrono::{DateTime, Local};

/// Title given to a conversation before its first exchange.
pub const DEFAULT_TITLE: &str = "New chat";

/// Number of characters of the first user message kept in a derived title.
pub const TITLE_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    pub active: bool,
    pub messages: Vec<Message>,
}

/// In-memory store for all conversations in the session.
///
/// Messages live on their conversation, keyed by conversation id, and the
/// visible sequence is always the active conversation's. Exactly one
/// conversation is active at a time; the store starts with one.
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    next_conversation_id: u64,
    next_message_id: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        let mut store = Self {
            conversations: Vec::new(),
            next_conversation_id: 1,
            next_message_id: 1,
        };
        store.create_conversation();
        store
    }

    /// Deactivates every existing conversation, then creates and activates a
    /// new empty one. Returns the new conversation's id.
    pub fn create_conversation(&mut self) -> u64 {
        for conversation in &mut self.conversations {
            conversation.active = false;
        }

        let id = self.next_conversation_id;
        self.next_conversation_id += 1;

        self.conversations.push(Conversation {
            id,
            title: DEFAULT_TITLE.to_string(),
            active: true,
            messages: Vec::new(),
        });

        id
    }

    /// Makes the given conversation the active one. Unknown ids are ignored.
    pub fn activate(&mut self, id: u64) {
        if self.conversations.iter().any(|c| c.id == id) {
            for conversation in &mut self.conversations {
                conversation.active = conversation.id == id;
            }
        }
    }

    /// Appends a message to the active conversation. User messages with
    /// only-whitespace content are dropped.
    pub fn append_message(&mut self, role: Role, content: &str) {
        let active_id = self.active_id();
        self.append_to(active_id, role, content);
    }

    /// Appends a message to a specific conversation, so a reply can land in
    /// the conversation that sent the request even if the user has switched
    /// away in the meantime. Unknown ids are ignored.
    pub fn append_to(&mut self, conversation_id: u64, role: Role, content: &str) {
        if role == Role::User && content.trim().is_empty() {
            return;
        }

        let id = self.next_message_id;
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.messages.push(Message {
                id,
                role,
                content: content.to_string(),
                timestamp: Local::now(),
            });
            self.next_message_id += 1;
        }
    }

    /// Replaces a conversation's default title with one derived from the
    /// given message text. No-op once a conversation has been renamed.
    pub fn rename_conversation(&mut self, conversation_id: u64, source: &str) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            if conversation.title == DEFAULT_TITLE {
                conversation.title = derive_title(source);
            }
        }
    }

    /// Encodes the active conversation's history as (user, assistant) pairs.
    /// A user message whose turn failed pairs with an empty string.
    pub fn history_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();

        for message in self.messages() {
            match message.role {
                Role::User => pairs.push((message.content.clone(), String::new())),
                Role::Assistant => match pairs.last_mut() {
                    Some(pair) if pair.1.is_empty() => pair.1 = message.content.clone(),
                    _ => pairs.push((String::new(), message.content.clone())),
                },
            }
        }

        pairs
    }

    pub fn active_id(&self) -> u64 {
        self.conversations[self.active_index()].id
    }

    pub fn active_title(&self) -> &str {
        &self.conversations[self.active_index()].title
    }

    /// Messages of the active conversation, in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.conversations[self.active_index()].messages
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: u64) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn active_index(&self) -> usize {
        // The store always holds at least one conversation and exactly one
        // is active, so this falls back only in theory.
        self.conversations
            .iter()
            .position(|c| c.active)
            .unwrap_or(0)
    }
}

fn derive_title(source: &str) -> String {
    let preview: String = source.chars().take(TITLE_LEN).collect();
    format!("{}...", preview)
}
