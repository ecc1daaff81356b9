//! Travel assistant client library (backend HTTP client, config, chat thread).
//! Used by the `travel-chat` terminal binary.

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod keepalive;
pub mod messages;

pub use client::BackendClient;
pub use config::{default_config_path, ClientConfig, Config, KeepAliveRestart};
pub use conversation::{ChatMessage, Conversation, QuickAction, SendRejected, TravelData};
pub use error::{ClientError, ConfigError, QueryError};
pub use messages::{
    BackendStats, Language, LocationInfo, PlaceData, Preferences, QueryResponse, WeatherData,
};
