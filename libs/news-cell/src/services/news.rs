use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateNewsRequest, News, NewsError, NewsHeadline, NewsQuery, Pagination, UpdateNewsRequest,
};

const TABLE: &str = "news";

/// Published articles for citizens, and the admin desk that writes them.
pub struct NewsService {
    supabase: SupabaseClient,
}

impl NewsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_published(&self, query: &NewsQuery) -> Result<(Vec<News>, Pagination), NewsError> {
        let mut filter = "is_published=eq.true".to_string();
        if let Some(category) = query.category {
            filter.push_str(&format!("&category=eq.{}", category.as_str()));
        }

        let count_path = format!("/rest/v1/{}?select=id&{}", TABLE, filter);
        let ids: Vec<Value> = self.supabase.select(&count_path, None).await?;

        let (page, limit) = (query.page(), query.limit());
        let offset = (page - 1) * limit;
        let path = format!(
            "/rest/v1/{}?{}&order=publish_date.desc&limit={}&offset={}",
            TABLE, filter, limit, offset
        );
        let news: Vec<News> = self.supabase.select(&path, None).await?;

        debug!("Listed {} of {} published articles", news.len(), ids.len());
        Ok((news, Pagination::new(page, limit, ids.len())))
    }

    /// Counts the read. A lost race on the counter only drops that one view.
    pub async fn read_published(&self, news_id: Uuid) -> Result<News, NewsError> {
        let path = format!("/rest/v1/{}?id=eq.{}&is_published=eq.true", TABLE, news_id);
        let news: News = self
            .supabase
            .select_one(&path, None)
            .await?
            .ok_or(NewsError::NotFound)?;

        let counted_path = format!(
            "/rest/v1/{}?id=eq.{}&view_count=eq.{}",
            TABLE, news_id, news.view_count
        );
        let patch = json!({ "view_count": news.view_count + 1 });
        match self.supabase.update::<News>(&counted_path, None, patch).await {
            Ok(rows) => match rows.into_iter().next() {
                Some(counted) => return Ok(counted),
                None => debug!("View count of article {} moved, view not counted", news_id),
            },
            Err(e) => warn!("Could not count view of article {}: {}", news_id, e),
        }

        Ok(news)
    }

    pub async fn latest(&self, count: u32) -> Result<Vec<NewsHeadline>, NewsError> {
        let path = format!(
            "/rest/v1/{}?select=id,title,summary,category,publish_date&is_published=eq.true&order=publish_date.desc&limit={}",
            TABLE, count
        );
        Ok(self.supabase.select(&path, None).await?)
    }

    /// Drafts included.
    pub async fn list_all(&self, auth_token: &str) -> Result<Vec<News>, NewsError> {
        let path = format!("/rest/v1/{}?order=created_at.desc", TABLE);
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn create(
        &self,
        admin_id: Uuid,
        request: CreateNewsRequest,
        auth_token: &str,
    ) -> Result<News, NewsError> {
        let article = request.validate()?;
        let now = Utc::now().to_rfc3339();

        let mut body = serde_json::to_value(&article)
            .map_err(|e| NewsError::DatabaseError(e.to_string()))?;
        body["view_count"] = json!(0);
        body["created_by"] = json!(admin_id);
        body["created_at"] = json!(now);
        body["updated_at"] = json!(now);

        let news: News = self.supabase.insert(TABLE, Some(auth_token), body).await?;
        info!("Article {} '{}' created by {}", news.id, news.title, admin_id);
        Ok(news)
    }

    pub async fn update(
        &self,
        news_id: Uuid,
        request: UpdateNewsRequest,
        auth_token: &str,
    ) -> Result<News, NewsError> {
        request.validate()?;

        let mut patch = serde_json::to_value(&request)
            .map_err(|e| NewsError::DatabaseError(e.to_string()))?;
        patch["updated_at"] = json!(Utc::now().to_rfc3339());

        let path = format!("/rest/v1/{}?id=eq.{}", TABLE, news_id);
        let rows: Vec<News> = self.supabase.update(&path, Some(auth_token), patch).await?;
        let news = rows.into_iter().next().ok_or(NewsError::NotFound)?;

        info!("Article {} updated", news_id);
        Ok(news)
    }

    pub async fn delete(&self, news_id: Uuid, auth_token: &str) -> Result<(), NewsError> {
        let path = format!("/rest/v1/{}?id=eq.{}", TABLE, news_id);
        let existing: Option<News> = self.supabase.select_one(&path, Some(auth_token)).await?;
        if existing.is_none() {
            warn!("Article {} not found for deletion", news_id);
            return Err(NewsError::NotFound);
        }

        self.supabase.delete(&path, Some(auth_token)).await?;
        info!("Article {} deleted", news_id);
        Ok(())
    }
}
