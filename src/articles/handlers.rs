use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    articles::{
        dto::{
            ArticleDetail, EditArticleRequest, EditedArticle, IdQuery, ListQuery, PageQuery,
            PageResponse, PublishArticleRequest, PublishedArticle, SearchQuery,
        },
        services,
    },
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

// --- public routers ---

/// Routes that never look at the Authorization header.
pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/article/list", get(list_articles))
        .route("/article/detail", get(get_article))
        .route("/search/article", get(search_articles))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/article/publish", post(publish_article))
        .route("/article/edit", put(edit_article))
        .route("/article/delete", delete(delete_article))
        .route("/article/myPosts", get(my_posts))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Envelope<PageResponse>> {
    let Query(query) = query?;
    let window = query.window()?;
    let page = services::list(state.articles.as_ref(), window, query.category_filter()).await?;
    Ok(Envelope::ok("ok", PageResponse::new(page, window)))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Envelope<ArticleDetail>> {
    let Query(query) = query?;
    let article = services::detail(state.articles.as_ref(), query.require()?).await?;
    Ok(Envelope::ok("ok", article.into()))
}

#[instrument(skip(state))]
pub async fn search_articles(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Envelope<PageResponse>> {
    let Query(query) = query?;
    let window = query.window()?;
    let page = services::search(state.articles.as_ref(), query.keyword.as_deref(), window).await?;
    Ok(Envelope::ok("ok", PageResponse::new(page, window)))
}

#[instrument(skip_all)]
pub async fn publish_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: Result<Json<PublishArticleRequest>, JsonRejection>,
) -> ApiResult<Envelope<PublishedArticle>> {
    let Json(body) = body?;
    let article = services::publish(
        state.articles.as_ref(),
        state.users.as_ref(),
        &principal,
        body,
    )
    .await?;
    Ok(Envelope::ok(
        "published",
        PublishedArticle {
            id: article.id,
            title: article.title,
            create_time: article.created_at,
        },
    ))
}

#[instrument(skip_all)]
pub async fn edit_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: Result<Json<EditArticleRequest>, JsonRejection>,
) -> ApiResult<Envelope<EditedArticle>> {
    let Json(body) = body?;
    let (id, fields) = body.into_parts();
    let id = id.ok_or_else(|| ApiError::validation("article id is required"))?;
    let article = services::edit(state.articles.as_ref(), &principal, id, fields).await?;
    Ok(Envelope::ok(
        "saved",
        EditedArticle {
            id: article.id,
            update_time: article.updated_at,
        },
    ))
}

#[instrument(skip_all)]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<Envelope<()>> {
    let Query(query) = query?;
    services::delete(state.articles.as_ref(), &principal, query.require()?).await?;
    Ok(Envelope::ok_empty("deleted"))
}

#[instrument(skip_all)]
pub async fn my_posts(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Envelope<PageResponse>> {
    let Query(query) = query?;
    let window = query.window()?;
    let page = services::list_mine(state.articles.as_ref(), &principal, window).await?;
    Ok(Envelope::ok("ok", PageResponse::new(page, window)))
}
