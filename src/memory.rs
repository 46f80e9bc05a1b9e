//! In-process stores used when no `DATABASE_URL` is configured, and by tests.
//! Same contracts as the Postgres stores; nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    articles::{
        repo::ArticleStore,
        repo_types::{Article, ArticleChanges, ArticlePage, Category, NewArticle, PageRequest},
    },
    auth::{
        repo::{UserStore, UsernameTaken},
        repo_types::User,
    },
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    articles: BTreeMap<i64, Article>,
    next_user_id: i64,
    next_article_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn paginate<'a>(matches: impl Iterator<Item = &'a Article>, page: PageRequest) -> ArticlePage {
    let mut items: Vec<&Article> = matches.collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    ArticlePage { items, total }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn exists(&self, username: &str) -> anyhow::Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().any(|u| u.username == username))
    }

    async fn insert(&self, username: &str, password_hash: &str) -> anyhow::Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == username) {
            return Err(UsernameTaken.into());
        }
        inner.next_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            avatar: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, new: NewArticle) -> anyhow::Result<Article> {
        let mut inner = self.inner.write().await;
        inner.next_article_id += 1;
        let now = OffsetDateTime::now_utc();
        let article = Article {
            id: inner.next_article_id,
            title: new.fields.title,
            description: new.fields.description,
            content: new.fields.content,
            category: new.fields.category,
            author_id: new.author_id,
            author_name: new.author_name,
            view_count: 0,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        inner.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Article>> {
        Ok(self.inner.read().await.articles.get(&id).cloned())
    }

    async fn update(&self, id: i64, changes: ArticleChanges) -> anyhow::Result<Option<Article>> {
        let mut inner = self.inner.write().await;
        let Some(article) = inner.articles.get_mut(&id) else {
            return Ok(None);
        };
        article.title = changes.title;
        article.description = changes.description;
        article.content = changes.content;
        article.category = changes.category;
        article.updated_at = OffsetDateTime::now_utc();
        Ok(Some(article.clone()))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.inner.write().await.articles.remove(&id).is_some())
    }

    async fn list(&self, page: PageRequest, category: Option<Category>) -> anyhow::Result<ArticlePage> {
        let inner = self.inner.read().await;
        let matches = inner
            .articles
            .values()
            .filter(|a| category.map_or(true, |c| a.category == c));
        Ok(paginate(matches, page))
    }

    async fn list_by_author(&self, author_id: i64, page: PageRequest) -> anyhow::Result<ArticlePage> {
        let inner = self.inner.read().await;
        let matches = inner.articles.values().filter(|a| a.author_id == author_id);
        Ok(paginate(matches, page))
    }

    async fn search(&self, keyword: &str, page: PageRequest) -> anyhow::Result<ArticlePage> {
        let needle = keyword.to_lowercase();
        let inner = self.inner.read().await;
        let matches = inner.articles.values().filter(|a| {
            [&a.title, &a.description, &a.content]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        });
        Ok(paginate(matches, page))
    }

    async fn increment_view_count(&self, id: i64) -> anyhow::Result<()> {
        if let Some(article) = self.inner.write().await.articles.get_mut(&id) {
            article.view_count += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, content: &str, category: Category) -> NewArticle {
        NewArticle {
            fields: ArticleChanges {
                title: title.into(),
                description: "desc".into(),
                content: content.into(),
                category,
            },
            author_id: 1,
            author_name: "alice".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::default();
        UserStore::insert(&store, "alice", "hash").await.unwrap();
        let err = UserStore::insert(&store, "alice", "hash").await.unwrap_err();
        assert!(err.is::<UsernameTaken>());
        assert!(store.exists("alice").await.unwrap());
        assert!(!store.exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let store = MemoryStore::default();
        for (title, cat) in [("a", Category::Life), ("b", Category::Tech), ("c", Category::Tech)] {
            ArticleStore::insert(&store, draft(title, "body", cat)).await.unwrap();
        }

        let all = store.list(PageRequest::default(), None).await.unwrap();
        assert_eq!(all.total, 3);
        let titles: Vec<_> = all.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["c", "b", "a"]);

        let tech = store.list(PageRequest::default(), Some(Category::Tech)).await.unwrap();
        assert_eq!(tech.total, 2);

        let second = store.list(PageRequest::new(2, 2).unwrap(), None).await.unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].title, "a");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = MemoryStore::default();
        ArticleStore::insert(&store, draft("Learning Rust", "ownership", Category::Tech)).await.unwrap();
        ArticleStore::insert(&store, draft("Dumplings", "pork and chives", Category::Food)).await.unwrap();

        let hits = store.search("rust", PageRequest::default()).await.unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.items[0].title, "Learning Rust");

        let hits = store.search("CHIVE", PageRequest::default()).await.unwrap();
        assert_eq!(hits.total, 1);

        let hits = store.search("desc", PageRequest::default()).await.unwrap();
        assert_eq!(hits.total, 2);

        let hits = store.search("nothing", PageRequest::default()).await.unwrap();
        assert_eq!(hits.total, 0);
    }

    #[tokio::test]
    async fn delete_is_hard_removal() {
        let store = MemoryStore::default();
        let a = ArticleStore::insert(&store, draft("t", "c", Category::Life)).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(ArticleStore::find_by_id(&store, a.id).await.unwrap().is_none());
        assert!(store.update(a.id, draft("x", "y", Category::Food).fields).await.unwrap().is_none());
    }
}
