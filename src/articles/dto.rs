use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Article, ArticlePage, Category, PageRequest};
use crate::error::{ApiError, ApiResult};

/// Body of `POST /article/publish`. Missing fields deserialize as empty and
/// are rejected by validation.
#[derive(Debug, Default, Deserialize)]
pub struct PublishArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
}

/// Body of `PUT /article/edit`: a full replacement of the editable fields.
#[derive(Debug, Deserialize)]
pub struct EditArticleRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
}

impl EditArticleRequest {
    pub fn into_parts(self) -> (Option<i64>, PublishArticleRequest) {
        let fields = PublishArticleRequest {
            title: self.title,
            description: self.description,
            content: self.content,
            category: self.category,
        };
        (self.id, fields)
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<i64>,
}

impl IdQuery {
    pub fn require(&self) -> ApiResult<i64> {
        self.id.ok_or_else(|| ApiError::validation("article id is required"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn page_window(page: Option<i64>, page_size: Option<i64>) -> ApiResult<PageRequest> {
    PageRequest::new(
        page.unwrap_or(PageRequest::DEFAULT_PAGE),
        page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
    )
    .ok_or_else(|| {
        ApiError::validation(format!(
            "page must be >= 1 and pageSize between 1 and {}",
            PageRequest::MAX_PAGE_SIZE
        ))
    })
}

impl PageQuery {
    pub fn window(&self) -> ApiResult<PageRequest> {
        page_window(self.page, self.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub category: Option<String>,
}

impl ListQuery {
    pub fn window(&self) -> ApiResult<PageRequest> {
        page_window(self.page, self.page_size)
    }

    /// `all`, an unknown value or no value means no filter.
    pub fn category_filter(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl SearchQuery {
    pub fn window(&self) -> ApiResult<PageRequest> {
        page_window(self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Category,
    pub author: String,
    pub author_id: i64,
    pub view_count: i64,
    pub like_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub update_time: OffsetDateTime,
}

impl From<Article> for ArticleDetail {
    fn from(a: Article) -> Self {
        Self {
            id: a.id,
            title: a.title,
            description: a.description,
            content: a.content,
            category: a.category,
            author: a.author_name,
            author_id: a.author_id,
            view_count: a.view_count,
            like_count: a.like_count,
            create_time: a.created_at,
            update_time: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub author: String,
    pub author_id: i64,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
}

impl From<Article> for ArticleSummary {
    fn from(a: Article) -> Self {
        Self {
            id: a.id,
            title: a.title,
            description: a.description,
            category: a.category,
            author: a.author_name,
            author_id: a.author_id,
            view_count: a.view_count,
            create_time: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub list: Vec<ArticleSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl PageResponse {
    pub fn new(result: ArticlePage, window: PageRequest) -> Self {
        Self {
            list: result.items.into_iter().map(ArticleSummary::from).collect(),
            total: result.total,
            page: window.page(),
            page_size: window.page_size(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedArticle {
    pub id: i64,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedArticle {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub update_time: OffsetDateTime,
}
