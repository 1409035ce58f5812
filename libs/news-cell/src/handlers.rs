use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{latest_count, NewsQuery};
use crate::services::NewsService;

pub async fn list_news(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Value>, AppError> {
    let (news, pagination) = NewsService::new(&state).list_published(&query).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "news": news,
            "pagination": pagination
        }
    })))
}

pub async fn get_news(
    State(state): State<Arc<AppConfig>>,
    Path(news_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let news = NewsService::new(&state).read_published(news_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": news
    })))
}

pub async fn latest_news(
    State(state): State<Arc<AppConfig>>,
    Path(count): Path<String>,
) -> Result<Json<Value>, AppError> {
    let headlines = NewsService::new(&state).latest(latest_count(&count)).await?;

    Ok(Json(json!({
        "success": true,
        "data": headlines
    })))
}
