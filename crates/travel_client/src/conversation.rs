//! Chat thread state: the messages shown to the user, their preferences and
//! the last known backend status. Sending goes through a [`BackendClient`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::client::BackendClient;
use crate::messages::{Language, LocationInfo, PlaceData, Preferences, QueryResponse, WeatherData};

pub const WELCOME_TEXT: &str = "Welcome to your AI travel companion! Ask me about weather, hidden gems, local attractions, or let me help you plan an itinerary for any destination.";

pub const APOLOGY_TEXT: &str = "Sorry, I'm having trouble connecting to my services. Please check your internet connection and try again.";

/// How often a chat front end refreshes the backend status indicator.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Ready-made questions offered to the user.
pub const SUGGESTED_QUERIES: [&str; 4] = [
    "Best cafes in Paris",
    "Tokyo weather forecast",
    "Things to do in Rome",
    "Restaurants in Bangkok",
];

/// Shortcut that pre-fills the input with a question prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Weather,
    Places,
    Plan,
}

impl QuickAction {
    pub fn template(self) -> &'static str {
        match self {
            QuickAction::Weather => "What's the weather in ",
            QuickAction::Places => "What are the tourist attractions in ",
            QuickAction::Plan => "I'm planning a trip to ",
        }
    }
}

/// Structured data attached to an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelData {
    pub location_info: Option<LocationInfo>,
    pub weather_data: Option<WeatherData>,
    pub places_data: Option<Vec<PlaceData>>,
}

/// One bubble in the thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub is_user: bool,
    pub data: Option<TravelData>,
}

/// Why a send did not reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendRejected {
    EmptyMessage,
}

impl std::fmt::Display for SendRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendRejected::EmptyMessage => write!(f, "message is empty"),
        }
    }
}

impl std::error::Error for SendRejected {}

/// The chat thread.
///
/// `send` borrows the conversation mutably for the whole round trip, so a
/// second submission cannot start while one is outstanding.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    preferences: Preferences,
    last_error: Option<String>,
    online: bool,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl Conversation {
    pub fn new(preferences: Preferences) -> Self {
        let mut conversation = Self {
            messages: Vec::new(),
            preferences,
            last_error: None,
            online: true,
            next_id: 1,
        };
        conversation.push(WELCOME_TEXT.to_string(), false, None);
        conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Error text of the most recent failed send.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the backend answered the last send or health check.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Submit `text` and append the user message plus the assistant's answer.
    ///
    /// A backend failure is not an error here: it becomes an apology bubble,
    /// `last_error` and an offline status. Returns the appended assistant message.
    pub async fn send(
        &mut self,
        client: &BackendClient,
        text: &str,
    ) -> Result<&ChatMessage, SendRejected> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }

        self.last_error = None;
        self.push(message.to_string(), true, None);

        let outcome = client.submit_query(message, &self.preferences).await;
        match outcome {
            Ok(response) => {
                self.online = true;
                let (reply, data) = split_response(response);
                Ok(self.push(reply, false, Some(data)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.last_error = Some(e.to_string());
                self.online = false;
                Ok(self.push(APOLOGY_TEXT.to_string(), false, None))
            }
        }
    }

    /// Change the language preference and note it in the thread.
    pub fn set_language(&mut self, language: Language) -> &ChatMessage {
        self.preferences.language = language;
        self.push(
            format!("Language preference updated to: {}", language.label()),
            false,
            None,
        )
    }

    /// Reset to just the welcome message.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_error = None;
        self.push(WELCOME_TEXT.to_string(), false, None);
    }

    /// Store a health result. Returns whether the online status changed.
    pub fn record_health(&mut self, healthy: bool) -> bool {
        let changed = self.online != healthy;
        self.online = healthy;
        changed
    }

    /// Check backend health and record it. Returns the new status only when it changed.
    pub async fn refresh_health(&mut self, client: &BackendClient) -> Option<bool> {
        let healthy = client.check_health().await;
        self.record_health(healthy).then_some(healthy)
    }

    fn push(&mut self, text: String, is_user: bool, data: Option<TravelData>) -> &ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            text,
            is_user,
            data,
        });
        &self.messages[self.messages.len() - 1]
    }
}

/// Repeating tick for status polling, every [`STATUS_POLL_INTERVAL`].
///
/// The first tick fires one interval after creation; the caller checks health
/// once up front.
#[derive(Debug)]
pub struct StatusPoll {
    interval: Interval,
}

impl Default for StatusPoll {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPoll {
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let mut interval = interval_at(
            Instant::now() + STATUS_POLL_INTERVAL,
            STATUS_POLL_INTERVAL,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next poll. Cancel safe, so it can race stdin in `select!`.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

fn split_response(response: QueryResponse) -> (String, TravelData) {
    let data = TravelData {
        location_info: response.location_info,
        weather_data: response.weather_data,
        places_data: response.places_data,
    };
    (response.reply, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_welcome() {
        let conversation = Conversation::default();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].text, WELCOME_TEXT);
        assert!(!conversation.messages()[0].is_user);
        assert!(conversation.is_online());
    }

    #[test]
    fn language_change_is_announced() {
        let mut conversation = Conversation::default();
        let notice = conversation.set_language(Language::Local).clone();
        assert_eq!(notice.text, "Language preference updated to: Local Names");
        assert_eq!(conversation.preferences().language, Language::Local);

        conversation.set_language(Language::Both);
        assert_eq!(
            conversation.messages().last().unwrap().text,
            "Language preference updated to: Both (English preferred)"
        );
    }

    #[test]
    fn clear_resets_thread_but_keeps_preferences() {
        let mut conversation = Conversation::default();
        conversation.set_language(Language::Local);
        conversation.clear();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].text, WELCOME_TEXT);
        assert_eq!(conversation.preferences().language, Language::Local);
        assert!(conversation.last_error().is_none());
    }

    #[test]
    fn message_ids_increase() {
        let mut conversation = Conversation::default();
        conversation.set_language(Language::En);
        conversation.clear();
        let ids: Vec<u64> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn quick_action_templates() {
        assert_eq!(QuickAction::Weather.template(), "What's the weather in ");
        assert_eq!(
            QuickAction::Places.template(),
            "What are the tourist attractions in "
        );
        assert_eq!(QuickAction::Plan.template(), "I'm planning a trip to ");
    }

    #[test]
    fn record_health_reports_changes_only() {
        let mut conversation = Conversation::default();
        assert!(!conversation.record_health(true), "starts online");
        assert!(conversation.record_health(false));
        assert!(!conversation.record_health(false));
        assert!(!conversation.is_online());
        assert!(conversation.record_health(true));
    }

    #[tokio::test(start_paused = true)]
    async fn status_poll_ticks_every_interval() {
        let start = Instant::now();
        let mut poll = StatusPoll::new();

        poll.tick().await;
        let first = start.elapsed();
        assert!(first >= STATUS_POLL_INTERVAL && first < STATUS_POLL_INTERVAL * 2);

        poll.tick().await;
        poll.tick().await;
        let third = start.elapsed();
        assert!(third >= STATUS_POLL_INTERVAL * 3 && third < STATUS_POLL_INTERVAL * 4);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_touching_thread() {
        let mut config = crate::config::ClientConfig::with_base_url("http://127.0.0.1:9");
        config.keep_alive_on_start = false;
        let client = BackendClient::new(config).unwrap();

        let mut conversation = Conversation::default();
        let result = conversation.send(&client, "   ").await;
        assert_eq!(result.unwrap_err(), SendRejected::EmptyMessage);
        assert_eq!(conversation.messages().len(), 1);
    }
}
