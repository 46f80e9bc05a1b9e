use tracing::{info, warn};

use crate::{
    articles::{
        dto::PublishArticleRequest,
        repo::ArticleStore,
        repo_types::{Article, ArticleChanges, ArticlePage, Category, NewArticle, PageRequest},
    },
    auth::{
        claims::Principal,
        guard::{require_owner, Action},
        repo::UserStore,
    },
    error::{ApiError, ApiResult},
};

const TITLE_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 200;
const CONTENT_MAX: usize = 2000;

fn check_len(field: &str, value: &str, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < 1 || len > max {
        return Err(ApiError::validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validates a submitted form. Runs before any store call.
pub(crate) fn validate(form: PublishArticleRequest) -> ApiResult<ArticleChanges> {
    if form.title.is_empty()
        || form.description.is_empty()
        || form.content.is_empty()
        || form.category.is_empty()
    {
        return Err(ApiError::validation(
            "title, description, content and category are required",
        ));
    }
    check_len("title", &form.title, TITLE_MAX)?;
    check_len("description", &form.description, DESCRIPTION_MAX)?;
    check_len("content", &form.content, CONTENT_MAX)?;
    let category: Category = form
        .category
        .parse()
        .map_err(|_| ApiError::validation("category must be one of life, food, tech"))?;

    Ok(ArticleChanges {
        title: form.title,
        description: form.description,
        content: form.content,
        category,
    })
}

async fn find_existing(articles: &dyn ArticleStore, id: i64) -> ApiResult<Article> {
    articles
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".into()))
}

pub async fn publish(
    articles: &dyn ArticleStore,
    users: &dyn UserStore,
    principal: &Principal,
    form: PublishArticleRequest,
) -> ApiResult<Article> {
    let fields = validate(form)?;

    let author = users
        .find_by_id(principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let article = articles
        .insert(NewArticle {
            fields,
            author_id: author.id,
            author_name: author.username,
        })
        .await?;
    info!(article_id = article.id, author_id = article.author_id, "article published");
    Ok(article)
}

pub async fn edit(
    articles: &dyn ArticleStore,
    principal: &Principal,
    id: i64,
    form: PublishArticleRequest,
) -> ApiResult<Article> {
    let changes = validate(form)?;
    let existing = find_existing(articles, id).await?;
    require_owner(principal, existing.author_id, Action::Edit)?;

    let updated = articles
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".into()))?;
    info!(article_id = id, user_id = principal.user_id, "article edited");
    Ok(updated)
}

pub async fn delete(articles: &dyn ArticleStore, principal: &Principal, id: i64) -> ApiResult<()> {
    let existing = find_existing(articles, id).await?;
    require_owner(principal, existing.author_id, Action::Delete)?;

    if !articles.delete(id).await? {
        warn!(article_id = id, "delete removed no rows");
        return Err(ApiError::Store(anyhow::anyhow!("article {id} vanished before delete")));
    }
    info!(article_id = id, user_id = principal.user_id, "article deleted");
    Ok(())
}

/// Public fetch. Every successful fetch counts as a view.
pub async fn detail(articles: &dyn ArticleStore, id: i64) -> ApiResult<Article> {
    let mut article = find_existing(articles, id).await?;
    articles.increment_view_count(id).await?;
    article.view_count += 1;
    Ok(article)
}

pub async fn list(
    articles: &dyn ArticleStore,
    page: PageRequest,
    category: Option<Category>,
) -> ApiResult<ArticlePage> {
    Ok(articles.list(page, category).await?)
}

pub async fn list_mine(
    articles: &dyn ArticleStore,
    principal: &Principal,
    page: PageRequest,
) -> ApiResult<ArticlePage> {
    Ok(articles.list_by_author(principal.user_id, page).await?)
}

pub async fn search(
    articles: &dyn ArticleStore,
    keyword: Option<&str>,
    page: PageRequest,
) -> ApiResult<ArticlePage> {
    // blank means missing; a non-blank keyword is matched as sent
    let keyword = keyword
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::validation("keyword is required"))?;
    Ok(articles.search(keyword, page).await?)
}
