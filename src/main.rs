mod cli;
mod client;
mod config;
mod controller;
mod error;
mod format;
mod gui;
mod opener;
mod types;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;
use crate::client::HttpSearchApi;
use crate::config::ClientSettings;
use crate::controller::SearchController;
use crate::gui::ExpedientesApp;
use crate::opener::{FileOpener, SystemLauncher};

fn main() -> anyhow::Result<()> {
    // 初始化日志（写 stderr，--json 输出保持干净）
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = CliArgs::parse();
    let settings = ClientSettings::new(&args.server, args.timeout_secs)
        .with_context(|| format!("dirección de servidor inválida: {}", args.server))?;
    tracing::info!("servidor: {}", settings.server_url);

    let runtime = tokio::runtime::Runtime::new()?;

    if args.is_headless() {
        return runtime.block_on(cli::run_cli(args, settings));
    }

    let api = Arc::new(HttpSearchApi::new(&settings)?);
    let opener = FileOpener::new(settings.server_url.clone(), Arc::new(SystemLauncher));
    let controller = SearchController::new(api, runtime.handle().clone(), opener);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Buscador de Expedientes")
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Buscador de Expedientes",
        options,
        Box::new(move |cc| Ok(Box::new(ExpedientesApp::new(cc, controller)))),
    )
    .map_err(|e| anyhow::anyhow!("la interfaz terminó con error: {}", e))?;

    Ok(())
}
