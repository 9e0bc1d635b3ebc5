use std::sync::Arc;

use url::Url;

/// 在外部程序（浏览器 / PDF 阅读器）中打开链接
pub trait Launcher: Send + Sync {
    fn launch(&self, url: &str);
}

/// 系统默认程序，在后台线程启动，避免阻塞调用方
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, url: &str) {
        let url = url.to_string();
        std::thread::spawn(move || {
            if let Err(e) = open::that(&url) {
                tracing::error!("no se pudo abrir {}: {}", url, e);
            }
        });
    }
}

#[derive(Clone)]
pub struct FileOpener {
    base: Url,
    launcher: Arc<dyn Launcher>,
}

impl FileOpener {
    pub fn new(base: Url, launcher: Arc<dyn Launcher>) -> Self {
        Self { base, launcher }
    }

    /// `path` 是后端给的不透明令牌，整体做 URL 编码
    pub fn download_url(&self, path: &str) -> String {
        format!("{}download?file={}", self.base, urlencoding::encode(path))
    }

    pub fn open(&self, path: &str) {
        let url = self.download_url(path);
        tracing::info!("abriendo {}", url);
        self.launcher.launch(&url);
    }
}
