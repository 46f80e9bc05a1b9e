use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Life,
    Food,
    Tech,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Life, Category::Food, Category::Tech];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Life => "life",
            Category::Food => "food",
            Category::Tech => "tech",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown category {s:?}"))
    }
}

/// Article as stored. Owned by `author_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Category,
    pub author_id: i64,
    pub author_name: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Raw `articles` row; `category` is checked on conversion.
#[derive(Debug, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub author_id: i64,
    pub author_name: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ArticleRow> for Article {
    type Error = anyhow::Error;

    fn try_from(r: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            content: r.content,
            category: r.category.parse()?,
            author_id: r.author_id,
            author_name: r.author_name,
            view_count: r.view_count,
            like_count: r.like_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Editable fields, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub fields: ArticleChanges,
    pub author_id: i64,
    pub author_name: String,
}

/// A validated page window. Construct through `PageRequest::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_PAGE_SIZE: i64 = 10;
    pub const MAX_PAGE_SIZE: i64 = 100;

    /// Returns `None` when the window is out of range or its offset overflows.
    pub fn new(page: i64, page_size: i64) -> Option<Self> {
        if page < 1 || !(1..=Self::MAX_PAGE_SIZE).contains(&page_size) {
            return None;
        }
        (page - 1).checked_mul(page_size)?;
        Some(Self { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        // checked in `new`
        (self.page - 1) * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub total: i64,
}
