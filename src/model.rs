use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoryError;

/// Story genre requested by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    #[default]
    General,
    Comedy,
    Romance,
    Horror,
    Fantasy,
    SciFi,
    Mystery,
}

impl Genre {
    pub const ALL: [Genre; 7] = [
        Genre::General,
        Genre::Comedy,
        Genre::Romance,
        Genre::Horror,
        Genre::Fantasy,
        Genre::SciFi,
        Genre::Mystery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::General => "general",
            Genre::Comedy => "comedy",
            Genre::Romance => "romance",
            Genre::Horror => "horror",
            Genre::Fantasy => "fantasy",
            Genre::SciFi => "sci-fi",
            Genre::Mystery => "mystery",
        }
    }

    /// Parses an optional raw value; absent means `general`.
    pub fn parse_opt(raw: Option<&str>) -> Result<Self, StoryError> {
        raw.map_or(Ok(Genre::default()), str::parse)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
        .into_iter()
        .find(|g| g.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = Genre::ALL.iter().map(Genre::as_str).collect();
            StoryError::Validation(format!("Invalid genre. Available genres: {}", names.join(", ")))
        })
    }
}

/// Narrative length. Drives both the prompt wording and the token budget.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub const ALL: [StoryLength; 3] = [StoryLength::Short, StoryLength::Medium, StoryLength::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLength::Short => "short",
            StoryLength::Medium => "medium",
            StoryLength::Long => "long",
        }
    }

    /// Maximum output tokens requested from the model.
    pub fn max_tokens(&self) -> u32 {
        match self {
            StoryLength::Short => 600,
            StoryLength::Medium => 950,
            StoryLength::Long => 1600,
        }
    }

    pub fn parse_opt(raw: Option<&str>) -> Result<Self, StoryError> {
        raw.map_or(Ok(StoryLength::default()), str::parse)
    }
}

impl fmt::Display for StoryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryLength {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoryLength::ALL
        .into_iter()
        .find(|l| l.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = StoryLength::ALL.iter().map(StoryLength::as_str).collect();
            StoryError::Validation(format!("Invalid length. Available options: {}", names.join(", ")))
        })
    }
}

/// A generated story as kept in the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: String,
    pub emojis: Vec<String>,
    pub story: String,
    pub genre: Genre,
    pub length: StoryLength,
    /// ISO-8601, UTC, millisecond precision
    pub timestamp: String,
    pub likes: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub randomly_generated: bool,

    /// False when `story` holds the fallback text of a failed generation.
    #[serde(skip, default = "default_true")]
    pub generation_succeeded: bool,
}

fn default_true() -> bool {
    true
}

impl StoryRecord {
    pub fn new(emojis: Vec<String>, story: String, genre: Genre, length: StoryLength) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            emojis,
            story,
            genre,
            length,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            likes: 0,
            randomly_generated: false,
            generation_succeeded: true,
        }
    }

    pub fn view(&self) -> StoryView {
        StoryView {
            id: self.id.clone(),
            story: self.story.clone(),
            emojis: self.emojis.clone(),
            genre: self.genre,
            length: self.length,
            timestamp: self.timestamp.clone(),
        }
    }
}

/// What the generate endpoints hand back: the record minus its counters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryView {
    pub id: String,
    pub story: String,
    pub emojis: Vec<String>,
    pub genre: Genre,
    pub length: StoryLength,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub pages: usize,
    pub current_page: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page {
    pub stories: Vec<StoryRecord>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_stories_generated: u64,
    pub stories_in_history: usize,
    pub top_emojis: Vec<EmojiCount>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Likes {
    pub likes: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub results: Vec<StoryRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Health {
    pub status: String,
    pub uptime: f64,
    pub version: String,
}

/// Body of `POST /generate`. `emojis` stays untyped so a non-array value
/// surfaces as a validation error instead of a body rejection.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct GenerateRequest {
    #[serde(default)]
    pub emojis: Option<serde_json::Value>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub length: Option<String>,
}

/// Body of `POST /random-emoji-story`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RandomRequest {
    /// Any JSON value; numbers and numeric strings are coerced, the rest ignored.
    #[serde(default)]
    pub count: Option<serde_json::Value>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub length: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
}
