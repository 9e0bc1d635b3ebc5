//! Search form state machine.
//!
//! The controller never blocks: network calls run on the tokio runtime and
//! come back as [`Event`]s, which the UI drains every frame with
//! [`SearchController::poll`] (or one at a time with `next_event` in headless
//! mode). Only the owning thread mutates the controller.

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::client::SearchApi;
use crate::config;
use crate::error::{ClientError, Result};
use crate::format::{count_label, format_modified, format_size};
use crate::opener::FileOpener;
use crate::types::{
    BackendConfig, MatchDetails, MatchKind, SearchCriteria, SearchResponse, SearchResult,
};

pub type RepaintHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Displaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Expediente,
    Sello,
    Caratula,
}

/// 单条结果的展示数据
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub path: String,
    pub filename: String,
    pub relative_path: String,
    pub size_label: String,
    pub modified_label: String,
    pub tags: Vec<String>,
    /// 命中位置（文件名 / 内容），后端给了 match_details 才有
    pub found_in: Option<String>,
    pub relevance: Option<u32>,
}

fn found_in_label(details: &MatchDetails) -> Option<String> {
    fn join(kinds: &[MatchKind]) -> String {
        kinds.iter().map(|k| k.label()).collect::<Vec<_>>().join(", ")
    }
    let mut parts = Vec::new();
    if !details.filename_matches.is_empty() {
        parts.push(format!("Nombre: {}", join(&details.filename_matches)));
    }
    if !details.content_matches.is_empty() {
        parts.push(format!("Contenido: {}", join(&details.content_matches)));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

impl From<&SearchResult> for ResultItem {
    fn from(r: &SearchResult) -> Self {
        Self {
            path: r.path.clone(),
            filename: r.filename.clone(),
            relative_path: r.relative_path.clone(),
            size_label: format_size(r.size),
            modified_label: format_modified(r.modified),
            tags: r.matches.iter().map(|m| m.label().to_string()).collect(),
            found_in: r.match_details.as_ref().and_then(found_in_label),
            relevance: r.relevance_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub total: usize,
    pub count_label: String,
    pub items: Vec<ResultItem>,
}

impl ResultsView {
    pub fn from_response(resp: &SearchResponse) -> Self {
        let items = if resp.total == 0 {
            Vec::new()
        } else {
            resp.results.iter().map(ResultItem::from).collect()
        };
        Self {
            total: resp.total,
            count_label: count_label(resp.total),
            items,
        }
    }

    /// total = 0 时显示“无结果”状态
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// 错误横幅；自己持有消失时间，替换或隐藏时旧的期限随之作废
#[derive(Debug, Clone)]
struct ErrorBanner {
    message: String,
    expires_at: Instant,
}

enum Event {
    Config(Result<BackendConfig>),
    Search {
        seq: u64,
        outcome: Result<SearchResponse>,
    },
}

pub struct SearchController {
    api: Arc<dyn SearchApi>,
    runtime: Handle,
    opener: FileOpener,
    pub form: SearchCriteria,
    phase: Phase,
    results: Option<ResultsView>,
    banner: Option<ErrorBanner>,
    directory_label: String,
    directory_details: Option<String>,
    /// 最近一次发出的请求序号，只接受与之相同的响应
    latest_seq: u64,
    focus_request: Option<Field>,
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,
    repaint: Option<RepaintHook>,
}

impl SearchController {
    pub fn new(api: Arc<dyn SearchApi>, runtime: Handle, opener: FileOpener) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            api,
            runtime,
            opener,
            form: SearchCriteria::default(),
            phase: Phase::Idle,
            results: None,
            banner: None,
            directory_label: config::MSG_LOADING_CONFIG.to_string(),
            directory_details: None,
            latest_seq: 0,
            focus_request: Some(Field::Expediente),
            tx,
            rx,
            repaint: None,
        }
    }

    /// 事件到达时唤醒界面
    pub fn set_repaint_hook(&mut self, hook: RepaintHook) {
        self.repaint = Some(hook);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn results(&self) -> Option<&ResultsView> {
        self.results.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.banner.as_ref().map(|b| b.message.as_str())
    }

    /// 界面据此安排下一次重绘
    pub fn error_deadline(&self) -> Option<Instant> {
        self.banner.as_ref().map(|b| b.expires_at)
    }

    pub fn directory_label(&self) -> &str {
        &self.directory_label
    }

    pub fn directory_details(&self) -> Option<&str> {
        self.directory_details.as_deref()
    }

    pub fn take_focus_request(&mut self) -> Option<Field> {
        self.focus_request.take()
    }

    pub fn opener(&self) -> &FileOpener {
        &self.opener
    }

    /// 启动时调用一次，不阻塞搜索
    pub fn load_config(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        self.runtime.spawn(async move {
            let outcome = api.fetch_config().await;
            let _ = tx.send(Event::Config(outcome));
            if let Some(repaint) = repaint {
                repaint();
            }
        });
    }

    /// 提交表单，返回是否真正发出了请求
    pub fn submit(&mut self, now: Instant) -> bool {
        if self.form.is_empty() {
            debug!("búsqueda sin criterios");
            self.show_error(ClientError::Validation.user_message(), now);
            // 回到 Idle：旧结果和进行中的请求都作废
            self.results = None;
            self.phase = Phase::Idle;
            self.latest_seq += 1;
            return false;
        }

        self.hide_error();
        self.results = None;
        self.phase = Phase::Loading;
        self.latest_seq += 1;

        let seq = self.latest_seq;
        let criteria = self.form.trimmed();
        info!(
            seq,
            expediente = %criteria.expediente,
            sello = %criteria.sello,
            caratula = %criteria.caratula,
            "buscando"
        );

        let api = self.api.clone();
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        self.runtime.spawn(async move {
            let outcome = api.search(&criteria).await;
            let _ = tx.send(Event::Search { seq, outcome });
            if let Some(repaint) = repaint {
                repaint();
            }
        });
        true
    }

    /// 清空表单；进行中的请求作废
    pub fn clear(&mut self) {
        self.form = SearchCriteria {
            match_all: self.form.match_all,
            ..SearchCriteria::default()
        };
        self.results = None;
        self.hide_error();
        self.phase = Phase::Idle;
        self.latest_seq += 1;
        self.focus_request = Some(Field::Expediente);
    }

    pub fn open_result(&self, index: usize) -> bool {
        match self.results.as_ref().and_then(|r| r.items.get(index)) {
            Some(item) => {
                self.opener.open(&item.path);
                true
            }
            None => false,
        }
    }

    /// 每帧调用：处理已完成的请求并让过期的错误消失
    pub fn poll(&mut self, now: Instant) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event, now);
        }
        self.tick(now);
    }

    /// 等待下一个事件（无界面模式）
    pub async fn next_event(&mut self) {
        if let Some(event) = self.rx.recv().await {
            self.apply(event, Instant::now());
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.banner.as_ref().is_some_and(|b| b.expires_at <= now) {
            self.banner = None;
        }
    }

    fn show_error(&mut self, message: String, now: Instant) {
        self.banner = Some(ErrorBanner {
            message,
            expires_at: now + config::ERROR_DISMISS_AFTER,
        });
    }

    fn hide_error(&mut self) {
        self.banner = None;
    }

    fn apply(&mut self, event: Event, now: Instant) {
        match event {
            Event::Config(Ok(cfg)) => {
                info!("directorio de búsqueda: {}", cfg.search_directory);
                self.directory_details = cfg.details();
                self.directory_label = cfg.search_directory;
            }
            Event::Config(Err(e)) => {
                warn!("no se pudo cargar la configuración: {}", e);
                self.directory_label = config::MSG_CONFIG_FAILED.to_string();
                self.directory_details = None;
            }
            Event::Search { seq, .. } if seq != self.latest_seq => {
                debug!(seq, latest = self.latest_seq, "respuesta obsoleta descartada");
            }
            Event::Search {
                outcome: Ok(resp), ..
            } => {
                info!("{} resultados", resp.total);
                self.results = Some(ResultsView::from_response(&resp));
                self.phase = Phase::Displaying;
            }
            Event::Search {
                outcome: Err(e), ..
            } => {
                warn!("error en búsqueda: {}", e);
                self.show_error(e.user_message(), now);
                self.phase = Phase::Idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::tests::RecordingLauncher;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Scripted = (Option<oneshot::Receiver<()>>, Result<SearchResponse>);

    #[derive(Default)]
    struct FakeApi {
        config_fails: bool,
        responses: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<SearchCriteria>>,
    }

    impl FakeApi {
        fn push(&self, gate: Option<oneshot::Receiver<()>>, outcome: Result<SearchResponse>) {
            self.responses.lock().unwrap().push_back((gate, outcome));
        }

        fn calls(&self) -> Vec<SearchCriteria> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchApi for FakeApi {
        async fn fetch_config(&self) -> Result<BackendConfig> {
            if self.config_fails {
                Err(ClientError::Status(StatusCode::NOT_FOUND))
            } else {
                Ok(BackendConfig {
                    search_directory: "/srv/expedientes".to_string(),
                    ..Default::default()
                })
            }
        }

        async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResponse> {
            self.calls.lock().unwrap().push(criteria.clone());
            let (gate, outcome) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected search call");
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            outcome
        }
    }

    fn result(path: &str, matches: &[&str]) -> SearchResult {
        SearchResult {
            path: path.to_string(),
            relative_path: path.trim_start_matches('/').to_string(),
            filename: path.rsplit('/').next().unwrap_or(path).to_string(),
            size: 1536,
            modified: 1_700_000_000.0,
            matches: matches.iter().map(|m| MatchKind::from(m.to_string())).collect(),
            match_details: None,
            relevance_score: None,
        }
    }

    fn ok(results: Vec<SearchResult>) -> Result<SearchResponse> {
        Ok(SearchResponse {
            success: true,
            total: results.len(),
            results,
            error: None,
        })
    }

    fn controller(api: Arc<FakeApi>) -> (SearchController, Arc<RecordingLauncher>) {
        let launcher = Arc::new(RecordingLauncher::default());
        let base = url::Url::parse("http://127.0.0.1:5000/").unwrap();
        let opener = FileOpener::new(base, launcher.clone());
        (SearchController::new(api, Handle::current(), opener), launcher)
    }

    #[tokio::test]
    async fn blank_form_shows_validation_error_without_request() {
        let api = Arc::new(FakeApi::default());
        let (mut ctl, _) = controller(api.clone());
        ctl.form = SearchCriteria::new("   ", "", "\t");

        assert!(!ctl.submit(Instant::now()));
        tokio::task::yield_now().await;
        ctl.poll(Instant::now());

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.error_message(), Some(config::MSG_NO_CRITERIA));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn single_field_is_sent_trimmed_with_others_empty() {
        let api = Arc::new(FakeApi::default());
        api.push(None, ok(vec![result("/a/b.pdf", &["sello"])]));
        let (mut ctl, _) = controller(api.clone());
        ctl.form.sello = "  S-1 ".to_string();

        assert!(ctl.submit(Instant::now()));
        assert!(ctl.is_loading());
        ctl.next_event().await;

        assert_eq!(api.calls(), vec![SearchCriteria::new("", "S-1", "")]);
        assert_eq!(ctl.phase(), Phase::Displaying);
        let view = ctl.results().unwrap();
        assert_eq!(view.count_label, "1 documento encontrado");
        assert_eq!(view.items[0].tags, vec!["Sello"]);
        assert_eq!(view.items[0].size_label, "1.5 KB");
    }

    #[tokio::test]
    async fn zero_total_renders_empty_state() {
        let api = Arc::new(FakeApi::default());
        api.push(None, ok(Vec::new()));
        let (mut ctl, _) = controller(api);
        ctl.form.caratula = "nadie".to_string();

        ctl.submit(Instant::now());
        ctl.next_event().await;

        let view = ctl.results().unwrap();
        assert!(view.is_empty());
        assert!(view.items.is_empty());
        assert_eq!(ctl.phase(), Phase::Displaying);
    }

    #[tokio::test]
    async fn plural_label_and_tags() {
        let api = Arc::new(FakeApi::default());
        api.push(
            None,
            ok(vec![
                result("/x/1.pdf", &["expediente", "caratula"]),
                result("/x/2.pdf", &[]),
                result("/x/3.pdf", &["fecha"]),
            ]),
        );
        let (mut ctl, _) = controller(api);
        ctl.form.expediente = "12".to_string();

        ctl.submit(Instant::now());
        ctl.next_event().await;

        let view = ctl.results().unwrap();
        assert_eq!(view.count_label, "3 documentos encontrados");
        assert_eq!(view.items[0].tags, vec!["Expediente", "Carátula"]);
        assert!(view.items[1].tags.is_empty());
        assert_eq!(view.items[2].tags, vec!["fecha"]);
    }

    #[tokio::test]
    async fn backend_error_message_or_fallback() {
        let api = Arc::new(FakeApi::default());
        api.push(None, Err(ClientError::Backend(Some("X".to_string()))));
        api.push(None, Err(ClientError::Backend(None)));
        let (mut ctl, _) = controller(api);
        ctl.form.expediente = "1".to_string();

        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.error_message(), Some("X"));
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(ctl.results().is_none());

        ctl.submit(Instant::now());
        assert_eq!(ctl.error_message(), None);
        ctl.next_event().await;
        assert_eq!(ctl.error_message(), Some(config::MSG_SEARCH_FAILED));
    }

    #[tokio::test]
    async fn transport_and_malformed_errors_differ() {
        let api = Arc::new(FakeApi::default());
        api.push(None, Err(ClientError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        let bad = serde_json::from_str::<crate::types::SearchReply>("{}").unwrap_err();
        api.push(None, Err(ClientError::Malformed(bad)));
        let (mut ctl, _) = controller(api);
        ctl.form.expediente = "1".to_string();

        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.error_message(), Some(config::MSG_CONNECTION));

        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.error_message(), Some(config::MSG_MALFORMED));
        // 出错后表单仍可用
        assert!(!ctl.is_loading());
    }

    #[tokio::test]
    async fn error_banner_hides_after_five_seconds() {
        let api = Arc::new(FakeApi::default());
        let (mut ctl, _) = controller(api);
        let t0 = Instant::now();

        ctl.submit(t0);
        ctl.poll(t0 + Duration::from_millis(4999));
        assert!(ctl.error_message().is_some());
        ctl.poll(t0 + Duration::from_secs(5));
        assert!(ctl.error_message().is_none());
    }

    #[tokio::test]
    async fn replaced_error_keeps_its_own_lifetime() {
        let api = Arc::new(FakeApi::default());
        api.push(None, Err(ClientError::Backend(Some("nuevo".to_string()))));
        let (mut ctl, _) = controller(api);
        let t0 = Instant::now();

        ctl.submit(t0);
        assert_eq!(ctl.error_message(), Some(config::MSG_NO_CRITERIA));

        let t3 = t0 + Duration::from_secs(3);
        ctl.form.sello = "9".to_string();
        ctl.submit(t3);
        let event = ctl.rx.recv().await.unwrap();
        ctl.apply(event, t3);

        ctl.poll(t0 + Duration::from_secs(5));
        assert_eq!(ctl.error_message(), Some("nuevo"));
        ctl.poll(t3 + Duration::from_secs(5));
        assert_eq!(ctl.error_message(), None);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let api = Arc::new(FakeApi::default());
        let (release_first, gate) = oneshot::channel();
        api.push(Some(gate), ok(vec![result("/old.pdf", &["sello"])]));
        api.push(None, ok(vec![result("/n1.pdf", &[]), result("/n2.pdf", &[])]));
        let (mut ctl, _) = controller(api);
        ctl.form.sello = "1".to_string();

        ctl.submit(Instant::now());
        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.results().unwrap().total, 2);

        release_first.send(()).unwrap();
        ctl.next_event().await;
        assert_eq!(ctl.results().unwrap().total, 2);
        assert_eq!(ctl.phase(), Phase::Displaying);
    }

    #[tokio::test]
    async fn stale_error_does_not_show_banner() {
        let api = Arc::new(FakeApi::default());
        let (release_first, gate) = oneshot::channel();
        api.push(Some(gate), Err(ClientError::Backend(Some("viejo".to_string()))));
        api.push(None, ok(vec![result("/nuevo.pdf", &["sello"])]));
        let (mut ctl, _) = controller(api);
        ctl.form.sello = "1".to_string();

        ctl.submit(Instant::now());
        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.results().unwrap().total, 1);

        release_first.send(()).unwrap();
        ctl.next_event().await;
        assert_eq!(ctl.error_message(), None);
        assert_eq!(ctl.phase(), Phase::Displaying);
        assert_eq!(ctl.results().unwrap().items[0].filename, "nuevo.pdf");
    }

    #[tokio::test]
    async fn failed_validation_after_results_returns_to_idle() {
        let api = Arc::new(FakeApi::default());
        api.push(None, ok(vec![result("/a.pdf", &["expediente"])]));
        let (mut ctl, _) = controller(api);
        ctl.form.expediente = "a".to_string();
        ctl.submit(Instant::now());
        ctl.next_event().await;
        assert_eq!(ctl.phase(), Phase::Displaying);

        ctl.form.expediente = "  ".to_string();
        assert!(!ctl.submit(Instant::now()));
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(ctl.results().is_none());
        assert_eq!(ctl.error_message(), Some(config::MSG_NO_CRITERIA));
    }

    #[test]
    fn match_details_become_found_in_label() {
        let mut r = result("/x/exp.pdf", &["expediente", "caratula"]);
        assert_eq!(ResultItem::from(&r).found_in, None);

        r.match_details = Some(MatchDetails {
            filename_matches: vec![MatchKind::Expediente],
            content_matches: vec![MatchKind::Expediente, MatchKind::Caratula],
        });
        r.relevance_score = Some(2);
        let item = ResultItem::from(&r);
        assert_eq!(
            item.found_in.as_deref(),
            Some("Nombre: Expediente · Contenido: Expediente, Carátula")
        );
        assert_eq!(item.relevance, Some(2));

        r.match_details = Some(MatchDetails::default());
        assert_eq!(ResultItem::from(&r).found_in, None);
    }

    #[tokio::test]
    async fn clear_resets_form_and_drops_in_flight_search() {
        let api = Arc::new(FakeApi::default());
        let (release, gate) = oneshot::channel();
        api.push(Some(gate), ok(vec![result("/a.pdf", &[])]));
        let (mut ctl, _) = controller(api);
        assert_eq!(ctl.take_focus_request(), Some(Field::Expediente));
        ctl.form = SearchCriteria::new("1", "2", "3");

        ctl.submit(Instant::now());
        ctl.clear();
        assert_eq!(ctl.form, SearchCriteria::default());
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.take_focus_request(), Some(Field::Expediente));

        release.send(()).unwrap();
        ctl.next_event().await;
        assert!(ctl.results().is_none());
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn clicking_result_opens_download() {
        let api = Arc::new(FakeApi::default());
        api.push(None, ok(vec![result("/a/b.pdf", &["expediente"])]));
        let (mut ctl, launcher) = controller(api);
        ctl.form.expediente = "b".to_string();

        ctl.submit(Instant::now());
        ctl.next_event().await;

        assert!(ctl.open_result(0));
        assert!(!ctl.open_result(5));
        assert_eq!(
            launcher.opened.lock().unwrap().as_slice(),
            ["http://127.0.0.1:5000/download?file=%2Fa%2Fb.pdf"]
        );
    }

    #[tokio::test]
    async fn config_label_and_fallback() {
        let api = Arc::new(FakeApi::default());
        let (mut ctl, _) = controller(api);
        assert_eq!(ctl.directory_label(), config::MSG_LOADING_CONFIG);
        ctl.load_config();
        ctl.next_event().await;
        assert_eq!(ctl.directory_label(), "/srv/expedientes");

        let failing = Arc::new(FakeApi {
            config_fails: true,
            ..Default::default()
        });
        let (mut ctl, _) = controller(failing);
        ctl.load_config();
        ctl.next_event().await;
        assert_eq!(ctl.directory_label(), config::MSG_CONFIG_FAILED);
    }
}
