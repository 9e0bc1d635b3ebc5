//! HTTP access to the PDF search backend.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientSettings;
use crate::error::{ClientError, Result};
use crate::types::{BackendConfig, HealthStatus, SearchCriteria, SearchReply, SearchResponse};

/// 控制器与后端之间的接口，测试里用假实现替换
#[async_trait]
pub trait SearchApi: Send + Sync + 'static {
    async fn fetch_config(&self) -> Result<BackendConfig>;

    /// 只有 success = true 的响应会以 Ok 返回
    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResponse>;
}

#[derive(Clone)]
pub struct HttpSearchApi {
    client: Client,
    base: Url,
}

impl HttpSearchApi {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base: settings.server_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let resp = self.client.get(self.endpoint("health")?).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status()));
        }
        parse_body(resp).await
    }
}

async fn parse_body<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn fetch_config(&self) -> Result<BackendConfig> {
        let resp = self.client.get(self.endpoint("config")?).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status()));
        }
        parse_body(resp).await
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResponse> {
        let resp = self
            .client
            .post(self.endpoint("search")?)
            .json(criteria)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            // 后端出错时返回 500 + {success: false, error}
            return match serde_json::from_slice::<SearchReply>(&bytes) {
                Ok(reply) if !reply.success => {
                    warn!("búsqueda fallida ({}): {:?}", status, reply.error);
                    Err(ClientError::Backend(reply.error))
                }
                _ => Err(ClientError::Status(status)),
            };
        }

        let reply: SearchReply = serde_json::from_slice(&bytes)?;
        let body = reply.into_response()?;
        debug!("búsqueda completada: {} resultados", body.total);
        Ok(body)
    }
}
