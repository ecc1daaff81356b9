//! JSON types exchanged with the travel backend (`/api/query`, `/health`, `/api/stats`).

use serde::{Deserialize, Serialize};

/// Which place names the backend should use in its reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Local,
    Both,
}

impl Language {
    /// Wire code: `en`, `local` or `both`.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Local => "local",
            Language::Both => "both",
        }
    }

    /// Human label shown when the preference changes.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Local => "Local Names",
            Language::Both => "Both (English preferred)",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "local" => Ok(Language::Local),
            "both" => Ok(Language::Both),
            other => Err(format!("unknown language: {} (expected en, local or both)", other)),
        }
    }
}

/// User preferences sent with every query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
}

/// Client → backend: `POST /api/query` body.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub message: &'a str,
    pub preferences: &'a Preferences,
}

impl<'a> QueryRequest<'a> {
    pub fn new(message: &'a str, preferences: &'a Preferences) -> Self {
        Self {
            message,
            preferences,
        }
    }
}

/// Resolved location the reply is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// Current weather at the location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Backend → client: `POST /api/query` success body.
///
/// Missing optional sections mean "no data available". Unknown top-level
/// fields are kept in `extra` rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_info: Option<LocationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_data: Option<Vec<PlaceData>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QueryResponse {
    /// True when the backend attached any location, weather or places data.
    pub fn has_travel_data(&self) -> bool {
        self.location_info.is_some()
            || self.weather_data.is_some()
            || self.places_data.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Backend → client: error body on a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Backend → client: `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStats {
    pub cache_size: u64,
    pub status: String,
}
