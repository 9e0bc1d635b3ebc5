use std::time::Duration;

/// 默认后端地址（与服务端 config.ini 的默认端口一致）
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// 错误横幅自动消失时间
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

pub const MSG_NO_CRITERIA: &str = "Ingrese al menos un criterio de búsqueda";
pub const MSG_SEARCH_FAILED: &str = "Error en la búsqueda";
pub const MSG_CONNECTION: &str = "Error de conexión con el servidor";
pub const MSG_MALFORMED: &str = "Respuesta inválida del servidor";
pub const MSG_CONFIG_FAILED: &str = "Error al cargar configuración";
pub const MSG_LOADING_CONFIG: &str = "Cargando configuración...";
pub const MSG_NO_RESULTS: &str = "No se encontraron documentos";

/// 运行时配置，由命令行 / 环境变量得到
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: url::Url,
    /// None 表示不设超时，交给系统网络栈
    pub timeout: Option<Duration>,
}

impl ClientSettings {
    pub fn new(server: &str, timeout_secs: Option<u64>) -> Result<Self, url::ParseError> {
        let mut server_url = url::Url::parse(server)?;
        // 保证以 / 结尾，join 时不会吞掉最后一段路径
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }
        Ok(Self {
            server_url,
            timeout: timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }
}
