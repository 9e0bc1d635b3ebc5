use crate::controller::{Field, SearchController};
use chrono::Timelike;
use eframe::egui;
use std::sync::Arc;
use std::time::Instant;

pub struct ExpedientesApp {
    controller: SearchController,
    is_dark: bool,
}

impl ExpedientesApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut controller: SearchController) -> Self {
        // 事件到达时唤醒界面
        let ctx = cc.egui_ctx.clone();
        controller.set_repaint_hook(Arc::new(move || ctx.request_repaint()));
        controller.load_config();

        // 白天(6:00-18:00)浅色，晚上深色
        let hour = chrono::Local::now().hour();
        let is_dark = !(6..18).contains(&hour);
        cc.egui_ctx.set_visuals(if is_dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        Self { controller, is_dark }
    }
}

struct Theme {
    panel_bg: egui::Color32,
    text: egui::Color32,
    muted: egui::Color32,
    accent: egui::Color32,
    error_bg: egui::Color32,
    tag_bg: egui::Color32,
}

impl Theme {
    fn light() -> Self {
        Self {
            panel_bg: egui::Color32::from_rgb(240, 240, 240),
            text: egui::Color32::from_rgb(40, 40, 40),
            muted: egui::Color32::from_rgb(120, 120, 130),
            accent: egui::Color32::from_rgb(60, 120, 230),
            error_bg: egui::Color32::from_rgb(250, 220, 220),
            tag_bg: egui::Color32::from_rgb(210, 228, 255),
        }
    }

    fn dark() -> Self {
        Self {
            panel_bg: egui::Color32::from_rgb(30, 33, 40),
            text: egui::Color32::WHITE,
            muted: egui::Color32::from_rgb(140, 140, 150),
            accent: egui::Color32::from_rgb(100, 160, 255),
            error_bg: egui::Color32::from_rgb(110, 40, 40),
            tag_bg: egui::Color32::from_rgb(45, 70, 110),
        }
    }
}

impl eframe::App for ExpedientesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.controller.poll(now);

        // 错误横幅到期时需要一次重绘
        if let Some(deadline) = self.controller.error_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }

        let theme = if self.is_dark { Theme::dark() } else { Theme::light() };
        let focus = self.controller.take_focus_request();

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme.panel_bg).inner_margin(egui::Margin::symmetric(24.0, 16.0)))
            .show(ctx, |ui| {
                // 标题栏
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("📕 Buscador de Expedientes").size(20.0).color(theme.accent));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let icon = if self.is_dark { "☀" } else { "🌙" };
                        if ui.button(icon).clicked() {
                            self.is_dark = !self.is_dark;
                            ui.ctx().set_visuals(if self.is_dark {
                                egui::Visuals::dark()
                            } else {
                                egui::Visuals::light()
                            });
                        }
                    });
                });
                ui.label(
                    egui::RichText::new(format!("Directorio: {}", self.controller.directory_label()))
                        .size(13.0)
                        .color(theme.muted),
                );
                if let Some(details) = self.controller.directory_details() {
                    ui.label(egui::RichText::new(details).size(12.0).color(theme.muted));
                }

                ui.add_space(12.0);

                // 搜索表单
                let mut submit = false;
                egui::Grid::new("criteria").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    let fields = [
                        (Field::Expediente, "Expediente", "Número de expediente"),
                        (Field::Sello, "Sello", "Número de sello"),
                        (Field::Caratula, "Carátula", "Texto de la carátula"),
                    ];
                    for (field, label, hint) in fields {
                        ui.label(egui::RichText::new(label).color(theme.text));
                        let value = match field {
                            Field::Expediente => &mut self.controller.form.expediente,
                            Field::Sello => &mut self.controller.form.sello,
                            Field::Caratula => &mut self.controller.form.caratula,
                        };
                        let resp = ui.add(
                            egui::TextEdit::singleline(value)
                                .hint_text(hint)
                                .desired_width(360.0),
                        );
                        if focus == Some(field) {
                            resp.request_focus();
                        }
                        if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                            submit = true;
                        }
                        ui.end_row();
                    }
                });

                ui.add_space(8.0);
                ui.checkbox(&mut self.controller.form.match_all, "Coincidir con todos los criterios");
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    let loading = self.controller.is_loading();
                    let label = if loading { "Buscando..." } else { "🔍 Buscar" };
                    if ui.add_enabled(!loading, egui::Button::new(label).min_size(egui::vec2(110.0, 30.0))).clicked() {
                        submit = true;
                    }
                    if ui.add(egui::Button::new("Limpiar").min_size(egui::vec2(90.0, 30.0))).clicked() {
                        self.controller.clear();
                    }
                    if loading {
                        ui.spinner();
                    }
                });

                // Enter 与按钮一样，加载中不重复提交
                if submit && !self.controller.is_loading() {
                    self.controller.submit(now);
                }

                if let Some(message) = self.controller.error_message() {
                    ui.add_space(8.0);
                    egui::Frame::none()
                        .fill(theme.error_bg)
                        .rounding(6.0)
                        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(format!("⚠ {}", message)).color(theme.text));
                        });
                }

                ui.add_space(12.0);
                self.results_list(ui, &theme);
            });
    }
}

impl ExpedientesApp {
    fn results_list(&self, ui: &mut egui::Ui, theme: &Theme) {
        let Some(view) = self.controller.results() else {
            return;
        };

        if view.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label(egui::RichText::new(crate::config::MSG_NO_RESULTS).size(16.0).color(theme.muted));
            });
            return;
        }

        ui.label(egui::RichText::new(&view.count_label).size(15.0).color(theme.text));
        ui.add_space(6.0);

        let mut action_open = None;
        egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            for (i, item) in view.items.iter().enumerate() {
                let frame = egui::Frame::none()
                    .rounding(8.0)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                    .stroke(egui::Stroke::new(1.0, theme.accent.linear_multiply(0.4)));
                let response = frame
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.label(egui::RichText::new(format!("📄 {}", item.filename)).size(16.0).color(theme.text));
                        ui.label(egui::RichText::new(&item.relative_path).size(13.0).color(theme.muted));
                        ui.horizontal_wrapped(|ui| {
                            ui.label(
                                egui::RichText::new(format!("{} · {}", item.size_label, item.modified_label))
                                    .size(12.0)
                                    .color(theme.muted),
                            );
                            for tag in &item.tags {
                                egui::Frame::none()
                                    .fill(theme.tag_bg)
                                    .rounding(4.0)
                                    .inner_margin(egui::Margin::symmetric(6.0, 2.0))
                                    .show(ui, |ui| {
                                        ui.label(egui::RichText::new(tag).size(12.0).color(theme.text));
                                    });
                            }
                        });
                    })
                    .response
                    .interact(egui::Sense::click());

                // 悬停显示命中位置（文件名 / 内容）
                let response = match (&item.found_in, item.relevance) {
                    (Some(found_in), Some(score)) => {
                        response.on_hover_text(format!("{}\nRelevancia: {}", found_in, score))
                    }
                    (Some(found_in), None) => response.on_hover_text(found_in.as_str()),
                    (None, Some(score)) => response.on_hover_text(format!("Relevancia: {}", score)),
                    (None, None) => response,
                };

                if response.clicked() {
                    action_open = Some(i);
                }

                // 右键菜单
                response.context_menu(|ui| {
                    if ui.button("Abrir").clicked() {
                        action_open = Some(i);
                        ui.close_menu();
                    }
                    if ui.button("Copiar enlace de descarga").clicked() {
                        let link = self.controller.opener().download_url(&item.path);
                        ui.output_mut(|o| o.copied_text = link);
                        ui.close_menu();
                    }
                });

                if response.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }
                ui.add_space(6.0);
            }
        });

        if let Some(i) = action_open {
            self.controller.open_result(i);
        }
    }
}
