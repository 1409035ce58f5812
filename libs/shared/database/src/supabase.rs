use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Failures reported by PostgREST, kept distinguishable so services can
/// react to unique-index violations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// True when the error came from a PostgREST 409 (unique/exclusion index).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<DatabaseError>(), Some(DatabaseError::UniqueViolation(_)))
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let text = self.send(method, path, auth_token, body, extra_headers).await?;
        let data = serde_json::from_str::<T>(&text)
            .map_err(|e| anyhow!("Failed to parse response from {}: {}", path, e))?;
        Ok(data)
    }

    async fn send(&self, method: Method, path: &str, auth_token: Option<&str>,
                  body: Option<Value>, extra_headers: Option<HeaderMap>) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("API error ({}): {}", status, text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DatabaseError::Auth(text),
                StatusCode::NOT_FOUND => DatabaseError::NotFound(text),
                StatusCode::CONFLICT => DatabaseError::UniqueViolation(text),
                _ => DatabaseError::Api { status: status.as_u16(), message: text },
            }.into());
        }

        Ok(text)
    }

    /// GET rows matching a PostgREST query path, e.g. `/rest/v1/holidays?date=eq.2025-01-26`.
    pub async fn select<T>(&self, path: &str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request(Method::GET, path, auth_token, None).await
    }

    /// First row of a query, if any.
    pub async fn select_one<T>(&self, path: &str, auth_token: Option<&str>) -> Result<Option<T>>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.select(path, auth_token).await?;
        Ok(rows.into_iter().next())
    }

    /// POST a row and return the stored representation.
    pub async fn insert<T>(&self, table: &str, auth_token: Option<&str>, body: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}", table);
        let rows: Vec<T> = self.request_with_headers(
            Method::POST,
            &path,
            auth_token,
            Some(body),
            Some(representation_headers()),
        ).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no rows", table))
    }

    /// PATCH the rows selected by `path` and return their new representation.
    pub async fn update<T>(&self, path: &str, auth_token: Option<&str>, body: Value) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::PATCH,
            path,
            auth_token,
            Some(body),
            Some(representation_headers()),
        ).await
    }

    pub async fn delete(&self, path: &str, auth_token: Option<&str>) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));

        self.send(Method::DELETE, path, auth_token, None, Some(headers)).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
