use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

/// 搜索条件：案卷号 / 印章号 / 案由标题
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub expediente: String,
    pub sello: String,
    pub caratula: String,
    /// 仅在开启时序列化，默认请求体保持三字段
    #[serde(skip_serializing_if = "is_false")]
    pub match_all: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl SearchCriteria {
    pub fn new(expediente: &str, sello: &str, caratula: &str) -> Self {
        Self {
            expediente: expediente.to_string(),
            sello: sello.to_string(),
            caratula: caratula.to_string(),
            match_all: false,
        }
    }

    /// 去除首尾空白后的副本（发送给后端的就是它）
    pub fn trimmed(&self) -> Self {
        Self {
            expediente: self.expediente.trim().to_string(),
            sello: self.sello.trim().to_string(),
            caratula: self.caratula.trim().to_string(),
            match_all: self.match_all,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expediente.trim().is_empty()
            && self.sello.trim().is_empty()
            && self.caratula.trim().is_empty()
    }
}

/// 命中的条件类型，未知的标记原样保留
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Expediente,
    Sello,
    Caratula,
    Other(String),
}

impl MatchKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Expediente => "Expediente",
            Self::Sello => "Sello",
            Self::Caratula => "Carátula",
            Self::Other(raw) => raw,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Expediente => "expediente",
            Self::Sello => "sello",
            Self::Caratula => "caratula",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for MatchKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "expediente" => Self::Expediente,
            "sello" => Self::Sello,
            "caratula" => Self::Caratula,
            _ => Self::Other(raw),
        }
    }
}

impl<'de> Deserialize<'de> for MatchKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MatchKind::from)
    }
}

impl Serialize for MatchKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub filename_matches: Vec<MatchKind>,
    #[serde(default)]
    pub content_matches: Vec<MatchKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 服务器端绝对路径，仅作为下载令牌使用
    pub path: String,
    pub relative_path: String,
    pub filename: String,
    pub size: u64,
    /// 后端给出的是浮点秒
    pub modified: f64,
    #[serde(default)]
    pub matches: Vec<MatchKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_details: Option<MatchDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u32>,
}

/// 校验后的成功响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub error: Option<String>,
}

/// `/search` 的原始响应体；失败时后端只给 success 和 error
#[derive(Debug, Clone, Deserialize)]
pub struct SearchReply {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<SearchResult>>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SearchReply {
    /// success = true 时 results 与 total 必须都在且数量一致
    pub fn into_response(self) -> Result<SearchResponse, ClientError> {
        if !self.success {
            return Err(ClientError::Backend(self.error));
        }
        match (self.results, self.total) {
            (Some(results), Some(total)) if total == results.len() => Ok(SearchResponse {
                success: true,
                results,
                total,
                error: self.error,
            }),
            (Some(results), Some(total)) => Err(ClientError::Incomplete(format!(
                "total = {} but {} results",
                total,
                results.len()
            ))),
            (None, _) => Err(ClientError::Incomplete("missing `results`".to_string())),
            (_, None) => Err(ClientError::Incomplete("missing `total`".to_string())),
        }
    }
}

/// `/config` 返回的后端配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub search_directory: String,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub search_subdirectories: Option<bool>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl BackendConfig {
    /// 次要说明行，后端没给额外字段时为 None
    pub fn details(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(sub) = self.search_subdirectories {
            parts.push(if sub { "con subcarpetas" } else { "sin subcarpetas" }.to_string());
        }
        if let Some(cs) = self.case_sensitive {
            parts.push(
                if cs { "distingue mayúsculas" } else { "no distingue mayúsculas" }.to_string(),
            );
        }
        if let Some(max) = self.max_results {
            parts.push(format!("máx. {} resultados", max));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" · "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub search_directory_exists: bool,
    pub version: String,
}
