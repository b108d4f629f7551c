use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category filter value meaning "no filtering".
pub const ALL: &str = "all";

/// Lesson id -> completed. A missing entry means not completed.
pub type ProgressMap = HashMap<String, bool>;

/// Lesson id -> free-text notes.
pub type NotesMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
    Other(String),
}

impl Level {
    pub fn label(&self) -> &str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::AllLevels => "All Levels",
            Level::Other(s) => s,
        }
    }
}

impl Default for Level {
    fn default() -> Self { Level::Beginner }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Beginner" => Level::Beginner,
            "Intermediate" => Level::Intermediate,
            "Advanced" => Level::Advanced,
            "All Levels" => Level::AllLevels,
            _ => Level::Other(s),
        }
    }
}

impl From<&str> for Level {
    fn from(s: &str) -> Self { Level::from(s.to_string()) }
}

impl From<Level> for String {
    fn from(l: Level) -> Self {
        match l {
            Level::Other(s) => s,
            other => other.label().to_string(),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Display-ready course record used by every catalog view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub instructor: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub rating: f64,
    pub students_count: u64,
    pub category: String,
    pub level: Level,
    pub duration: String,
    pub bestseller: bool,
    pub featured: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl CourseSummary {
    /// Whole-percent discount against the original price, if there is one.
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price.filter(|o| *o > 0.0)?;
        let pct = ((1.0 - self.price / original) * 100.0).round();
        Some(pct.max(0.0) as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    /// Free text, e.g. "15 mins".
    pub duration: String,
    pub is_free: bool,
    pub order_index: i64,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumSection {
    pub id: String,
    pub title: String,
    pub order_index: i64,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Popular,
    Newest,
    PriceLow,
    PriceHigh,
    Rating,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [SortKey::Popular, SortKey::Newest, SortKey::PriceLow, SortKey::PriceHigh, SortKey::Rating];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Popular => "popular",
            SortKey::Newest => "newest",
            SortKey::PriceLow => "price-low",
            SortKey::PriceHigh => "price-high",
            SortKey::Rating => "rating",
        }
    }

    /// Human label shown next to the sort selector.
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Popular => "Most Popular",
            SortKey::Newest => "Newest",
            SortKey::PriceLow => "Price: Low to High",
            SortKey::PriceHigh => "Price: High to Low",
            SortKey::Rating => "Highest Rated",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown sort key: {s}"))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// User-controlled catalog parameters. The sort key stays a raw string so an
/// unknown value can flow through and leave the order untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub category: String,
    pub query: String,
    pub sort: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self { category: ALL.to_string(), query: String::new(), sort: SortKey::Popular.as_str().to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub role: String,
    pub content: String,
    pub rating: i64,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub title: String,
    pub description: String,
    pub color: String,
}
