use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::articles::repo_types::{
    Article, ArticleChanges, ArticlePage, ArticleRow, Category, NewArticle, PageRequest,
};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, new: NewArticle) -> anyhow::Result<Article>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Article>>;
    /// `None` when no article has this id.
    async fn update(&self, id: i64, changes: ArticleChanges) -> anyhow::Result<Option<Article>>;
    /// `true` when a row was removed.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    async fn list(&self, page: PageRequest, category: Option<Category>) -> anyhow::Result<ArticlePage>;
    async fn list_by_author(&self, author_id: i64, page: PageRequest) -> anyhow::Result<ArticlePage>;
    /// Case-insensitive substring match on title, description or content.
    async fn search(&self, keyword: &str, page: PageRequest) -> anyhow::Result<ArticlePage>;
    async fn increment_view_count(&self, id: i64) -> anyhow::Result<()>;
}

/// Escapes `LIKE` wildcards so the keyword matches literally.
pub(crate) fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn into_articles(rows: Vec<ArticleRow>) -> anyhow::Result<Vec<Article>> {
    rows.into_iter().map(Article::try_from).collect()
}

const ARTICLE_COLUMNS: &str = "id, title, description, content, category, author_id, author_name, \
                               view_count, like_count, created_at, updated_at";

#[derive(Clone)]
pub struct PgArticleStore {
    db: PgPool,
}

impl PgArticleStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn insert(&self, new: NewArticle) -> anyhow::Result<Article> {
        let sql = format!(
            r#"
            INSERT INTO articles (title, description, content, category, author_id, author_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ARTICLE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&new.fields.title)
            .bind(&new.fields.description)
            .bind(&new.fields.content)
            .bind(new.fields.category.as_str())
            .bind(new.author_id)
            .bind(&new.author_name)
            .fetch_one(&self.db)
            .await
            .context("insert article")?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find article")?;
        row.map(Article::try_from).transpose()
    }

    async fn update(&self, id: i64, changes: ArticleChanges) -> anyhow::Result<Option<Article>> {
        let sql = format!(
            r#"
            UPDATE articles
               SET title = $1, description = $2, content = $3, category = $4, updated_at = now()
             WHERE id = $5
            RETURNING {ARTICLE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.content)
            .bind(changes.category.as_str())
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("update article")?;
        row.map(Article::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete article")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self, page: PageRequest, category: Option<Category>) -> anyhow::Result<ArticlePage> {
        let category = category.map(Category::as_str);
        // one connection for both statements; returned to the pool on drop
        let mut conn = self.db.acquire().await.context("acquire connection")?;

        let (total,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM articles WHERE ($1::text IS NULL OR category = $1)"#,
        )
        .bind(category)
        .fetch_one(&mut *conn)
        .await
        .context("count articles")?;

        let sql = format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
              FROM articles
             WHERE ($1::text IS NULL OR category = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(category)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await
            .context("list articles")?;

        Ok(ArticlePage {
            items: into_articles(rows)?,
            total,
        })
    }

    async fn list_by_author(&self, author_id: i64, page: PageRequest) -> anyhow::Result<ArticlePage> {
        let mut conn = self.db.acquire().await.context("acquire connection")?;

        let (total,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM articles WHERE author_id = $1"#)
            .bind(author_id)
            .fetch_one(&mut *conn)
            .await
            .context("count articles by author")?;

        let sql = format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
              FROM articles
             WHERE author_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(author_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await
            .context("list articles by author")?;

        Ok(ArticlePage {
            items: into_articles(rows)?,
            total,
        })
    }

    async fn search(&self, keyword: &str, page: PageRequest) -> anyhow::Result<ArticlePage> {
        let pattern = format!("%{}%", escape_like(keyword));
        let mut conn = self.db.acquire().await.context("acquire connection")?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM articles
             WHERE title ILIKE $1 ESCAPE '\'
                OR description ILIKE $1 ESCAPE '\'
                OR content ILIKE $1 ESCAPE '\'
            "#,
        )
        .bind(&pattern)
        .fetch_one(&mut *conn)
        .await
        .context("count search results")?;

        let sql = format!(
            r#"
            SELECT {ARTICLE_COLUMNS}
              FROM articles
             WHERE title ILIKE $1 ESCAPE '\'
                OR description ILIKE $1 ESCAPE '\'
                OR content ILIKE $1 ESCAPE '\'
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await
            .context("search articles")?;

        Ok(ArticlePage {
            items: into_articles(rows)?,
            total,
        })
    }

    async fn increment_view_count(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("increment view count")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("rust"), "rust");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }
}
