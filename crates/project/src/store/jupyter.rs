use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use super::{ContentEntry, ContentStore, EntryType, StoreError, UntitledRequest};
use crate::config::ServerSettings;
use crate::kind::split_path;

/// Client for a notebook server's REST contents API (`/api/contents`).
/// 筆記本伺服器 REST 內容 API 的用戶端。
#[derive(Debug, Clone)]
pub struct JupyterStore {
    client: Client,
    settings: ServerSettings,
}

/// Contents model as returned by the server; `content` is only populated for
/// directory listings.
#[derive(Debug, Deserialize)]
struct ContentsModel {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

impl From<ContentsModel> for ContentEntry {
    fn from(model: ContentsModel) -> Self {
        ContentEntry {
            name: model.name,
            path: model.path,
            entry_type: model.entry_type,
        }
    }
}

impl JupyterStore {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn with_client(client: Client, settings: ServerSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub(crate) fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|err| StoreError::InvalidPath(format!("{}: {err}", self.settings.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidPath(self.settings.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "contents"])
            .extend(split_path(path));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.settings.token.as_deref() {
            Some(token) => builder.header("Authorization", format!("token {token}")),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        tracing::warn!(path, status = status.as_u16(), "contents request failed");
        match status {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            StatusCode::CONFLICT => Err(StoreError::Conflict(path.to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    status: status.as_u16(),
                    message: error_message(&body),
                })
            }
        }
    }

    async fn model(&self, builder: RequestBuilder, path: &str) -> Result<ContentsModel, StoreError> {
        let response = self.send(builder, path).await?;
        response
            .json::<ContentsModel>()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }
}

/// Pulls the `message` field out of a server error body when present.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait(?Send)]
impl ContentStore for JupyterStore {
    async fn get(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("content", "1");
        tracing::debug!(%url, "listing remote directory");
        let model = self.model(self.request(Method::GET, url), path).await?;
        if model.entry_type != EntryType::Directory {
            return Err(StoreError::NotADirectory(path.to_string()));
        }
        let content = model.content.unwrap_or(serde_json::Value::Array(Vec::new()));
        let children: Vec<ContentsModel> =
            serde_json::from_value(content).map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(children.into_iter().map(ContentEntry::from).collect())
    }

    async fn new_untitled(&self, request: UntitledRequest) -> Result<ContentEntry, StoreError> {
        let url = self.contents_url(&request.path)?;
        let body = match request.ext.as_deref() {
            Some(_) => json!({ "type": request.entry_type, "ext": request.dotted_ext() }),
            None => json!({ "type": request.entry_type }),
        };
        let builder = self.request(Method::POST, url).json(&body);
        Ok(self.model(builder, &request.path).await?.into())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<ContentEntry, StoreError> {
        let url = self.contents_url(old_path)?;
        let builder = self
            .request(Method::PATCH, url)
            .json(&json!({ "path": new_path }));
        Ok(self.model(builder, old_path).await?.into())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let url = self.contents_url(path)?;
        self.send(self.request(Method::DELETE, url), path).await?;
        Ok(())
    }
}
