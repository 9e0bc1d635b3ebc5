use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use serde_json::json;

use crate::client::{HttpSearchApi, SearchApi};
use crate::config::{ClientSettings, DEFAULT_SERVER_URL};
use crate::controller::{ResultsView, SearchController};
use crate::opener::{FileOpener, SystemLauncher};
use crate::types::SearchCriteria;

#[derive(Parser, Debug)]
#[command(author, version, about = "Buscador de expedientes: cliente del servidor de búsqueda de PDFs", long_about = None)]
pub struct CliArgs {
    /// 后端地址
    #[arg(long, env = "EXPEDIENTES_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// 请求超时（秒），默认不限
    #[arg(long, env = "EXPEDIENTES_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// 案卷号
    #[arg(short = 'e', long)]
    pub expediente: Option<String>,

    /// 印章号
    #[arg(short = 's', long)]
    pub sello: Option<String>,

    /// 案由标题
    #[arg(short = 'c', long)]
    pub caratula: Option<String>,

    /// 所有条件都必须命中
    #[arg(long)]
    pub match_all: bool,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,

    /// 打开第 N 个结果（从 1 开始）
    #[arg(long, value_name = "N")]
    pub open: Option<usize>,

    /// 只检查后端状态
    #[arg(long)]
    pub check: bool,
}

impl CliArgs {
    /// 给了任何条件或 --check 就不启动窗口
    pub fn is_headless(&self) -> bool {
        self.check || self.expediente.is_some() || self.sello.is_some() || self.caratula.is_some()
    }
}

// CLI入口
pub async fn run_cli(args: CliArgs, settings: ClientSettings) -> anyhow::Result<()> {
    let api = Arc::new(HttpSearchApi::new(&settings)?);

    if args.check {
        let health = api.health().await?;
        let config = api.fetch_config().await?;
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "health": health, "config": config }))?
            );
        } else {
            println!("Servidor: {} ({} v{})", settings.server_url, health.status, health.version);
            println!("Directorio: {}", config.search_directory);
            if !health.search_directory_exists {
                println!("Aviso: el directorio de búsqueda no existe en el servidor");
            }
            if let Some(details) = config.details() {
                println!("{}", details);
            }
        }
        return Ok(());
    }

    let opener = FileOpener::new(settings.server_url.clone(), Arc::new(SystemLauncher));
    let mut controller = SearchController::new(api, tokio::runtime::Handle::current(), opener);
    controller.form = SearchCriteria {
        match_all: args.match_all,
        ..SearchCriteria::new(
            args.expediente.as_deref().unwrap_or_default(),
            args.sello.as_deref().unwrap_or_default(),
            args.caratula.as_deref().unwrap_or_default(),
        )
    };

    if controller.submit(std::time::Instant::now()) {
        while controller.is_loading() {
            controller.next_event().await;
        }
    }
    if let Some(message) = controller.error_message() {
        return Err(anyhow!("{}", message));
    }

    let view = controller
        .results()
        .ok_or_else(|| anyhow!("la búsqueda no produjo resultados"))?;

    if args.json {
        let output = json!({
            "total": view.total,
            "label": view.count_label,
            "results": view.items.iter().map(|item| json!({
                "filename": item.filename,
                "relative_path": item.relative_path,
                "size": item.size_label,
                "modified": item.modified_label,
                "matches": item.tags,
                "found_in": item.found_in,
                "relevance": item.relevance,
                "download": controller.opener().download_url(&item.path),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if view.is_empty() {
        println!("{}", crate::config::MSG_NO_RESULTS);
    } else {
        println!("{}", view.count_label);
        for (i, item) in view.items.iter().enumerate() {
            println!("{:>3}. {}", i + 1, item.filename);
            println!("     {}", item.relative_path);
            print!("     {} · {}", item.size_label, item.modified_label);
            if !item.tags.is_empty() {
                print!(" · [{}]", item.tags.join("] ["));
            }
            println!();
            if let Some(found_in) = &item.found_in {
                println!("     {}", found_in);
            }
        }
    }

    if let Some(n) = args.open {
        let url = nth_download_url(view, controller.opener(), n)?;
        tracing::info!("abriendo {}", url);
        // open::that 会等待外部程序启动，放到阻塞线程池里
        tokio::task::spawn_blocking(move || open::that(&url)).await??;
    }
    Ok(())
}

/// 第 N 个结果（从 1 开始）的下载链接
fn nth_download_url(view: &ResultsView, opener: &FileOpener, n: usize) -> anyhow::Result<String> {
    n.checked_sub(1)
        .and_then(|i| view.items.get(i))
        .map(|item| opener.download_url(&item.path))
        .ok_or_else(|| anyhow!("no existe el resultado {}", n))
}
