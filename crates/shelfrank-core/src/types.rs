//! Domain types flowing through the pipeline stages and the ranker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two item categories the system indexes and ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Books,
    Papers,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Books => "books",
            Category::Papers => "papers",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cleaned book record. Immutable once the cleaning stage has written it.
///
/// CSV headers keep the upstream catalog names (`publishedDate`, `avgrating`,
/// ...) so the cleaned table reads the same as the raw collection it came
/// from. `avg_rating` stays optional: an absent rating must score 0 later,
/// which a defaulted 0.0 could not distinguish from a genuine zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(rename = "publishedDate", default)]
    pub published_date: String,
    #[serde(rename = "avgrating", default)]
    pub avg_rating: Option<f64>,
    #[serde(rename = "pagecount", default)]
    pub page_count: i64,
    #[serde(rename = "previewLink", default)]
    pub preview_link: String,
}

/// One cleaned paper record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperRow {
    #[serde(rename = "SearchQuery", default)]
    pub search_query: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Abstract", default)]
    pub abstract_text: String,
    #[serde(rename = "Authors", default)]
    pub authors: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Citations", default)]
    pub citations: i64,
    #[serde(rename = "Venue", default)]
    pub venue: String,
    #[serde(rename = "URL", default)]
    pub url: String,
}

/// A book row plus the derived signals added by feature building.
/// Every `*_score` is in [0,1] and 0 wherever the raw signal is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookFeatureRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(rename = "publishedDate", default)]
    pub published_date: String,
    #[serde(rename = "avgrating", default)]
    pub avg_rating: Option<f64>,
    #[serde(rename = "pagecount", default)]
    pub page_count: i64,
    #[serde(rename = "previewLink", default)]
    pub preview_link: String,
    #[serde(default)]
    pub recency_score: f64,
    #[serde(default)]
    pub rating_score: f64,
    #[serde(default)]
    pub page_score: f64,
    #[serde(default)]
    pub combined_text: String,
}

/// A paper row plus the derived signals added by feature building.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperFeatureRow {
    #[serde(rename = "SearchQuery", default)]
    pub search_query: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Abstract", default)]
    pub abstract_text: String,
    #[serde(rename = "Authors", default)]
    pub authors: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Citations", default)]
    pub citations: i64,
    #[serde(rename = "Venue", default)]
    pub venue: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub recency_score: f64,
    #[serde(default)]
    pub citations_score: f64,
    #[serde(default)]
    pub combined_text: String,
}

/// One entry of a ranked result. The schema is the same for both categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub title: String,
    pub authors: String,
    pub year: String,
    pub url: String,
    pub sim_score: f64,
    pub final_score: f64,
}

/// The full response for one query. Created fresh per request, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub query: String,
    pub top_books: Vec<RankedItem>,
    pub top_papers: Vec<RankedItem>,
}
