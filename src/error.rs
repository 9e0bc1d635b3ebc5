use reqwest::StatusCode;
use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum ClientError {
    /// 三个条件都为空，不会发出请求
    #[error("no search criteria given")]
    Validation,
    /// 后端返回 success = false
    #[error("backend reported failure: {}", .0.as_deref().unwrap_or("<no message>"))]
    Backend(Option<String>),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    /// HTTP 成功但响应体不符合约定结构
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// 结构能解析，但 results / total 缺失或对不上
    #[error("incomplete response: {0}")]
    Incomplete(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// 界面上显示的文字
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation => config::MSG_NO_CRITERIA.to_string(),
            Self::Backend(Some(msg)) if !msg.trim().is_empty() => msg.clone(),
            Self::Backend(_) => config::MSG_SEARCH_FAILED.to_string(),
            Self::Malformed(_) | Self::Incomplete(_) => config::MSG_MALFORMED.to_string(),
            Self::Transport(_) | Self::Status(_) | Self::Url(_) => {
                config::MSG_CONNECTION.to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
