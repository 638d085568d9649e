use eframe::egui::{self, Align, Color32, RichText};

use super::{FileCenterModal, ListingState, ModalMode};
use crate::client::UploadedFile;
use crate::queue::TaskStatus;

const COLOR_OK: Color32 = Color32::from_rgb(0, 180, 0);
const COLOR_ERR: Color32 = Color32::from_rgb(220, 50, 50);
const COLOR_MUTED: Color32 = Color32::from_rgb(150, 150, 150);
const COLOR_BUSY: Color32 = Color32::from_rgb(0, 120, 215);

impl FileCenterModal {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            ui.vertical_centered(|ui| {
                ui.heading("文件中心");
            });
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui
                    .selectable_label(self.mode == ModalMode::List, "查看已上传")
                    .clicked()
                {
                    self.set_mode(ModalMode::List);
                }
                if ui
                    .selectable_label(self.mode == ModalMode::Upload, "上传新文件")
                    .clicked()
                {
                    self.set_mode(ModalMode::Upload);
                }
            });
            ui.separator();

            match self.mode {
                ModalMode::List => self.render_list(ui),
                ModalMode::Upload => self.render_upload(ui),
            }

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(8.0);
                if let Some(notice) = &self.notice {
                    let color = if notice.is_error { COLOR_ERR } else { COLOR_OK };
                    ui.colored_label(color, &notice.text);
                }
            });
        });
    }

    fn render_upload(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("📁 选择视频文件").clicked() {
                    self.pick_files();
                }
                ui.label(
                    RichText::new(format!(
                        "支持多个文件，并发上传数为 {}。",
                        self.queue.max_concurrent()
                    ))
                    .color(COLOR_MUTED),
                );
            });
        });

        ui.add_space(12.0);
        ui.label(RichText::new("上传任务列表").strong());
        ui.add_space(6.0);

        egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
            if self.tasks.is_empty() {
                ui.label("暂无上传任务");
                return;
            }

            let mut to_remove = None;
            for task in &self.tasks {
                ui.horizontal(|ui| {
                    ui.label("🎬");
                    ui.label(&task.file_name);
                    let (text, color) = match &task.status {
                        TaskStatus::Waiting => ("等待中", COLOR_MUTED),
                        TaskStatus::Uploading => ("上传中", COLOR_BUSY),
                        TaskStatus::Done(_) => ("成功", COLOR_OK),
                        TaskStatus::Error(_) => ("失败", COLOR_ERR),
                    };
                    ui.colored_label(color, text);
                    if let TaskStatus::Error(message) = &task.status {
                        ui.label(RichText::new(message).small().color(COLOR_MUTED));
                    }
                    if ui.small_button("移除").clicked() {
                        to_remove = Some(task.id);
                    }
                });
                ui.add_space(4.0);
            }
            if let Some(id) = to_remove {
                self.remove_task(id);
            }
        });
    }

    fn render_list(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);

        let mut to_open: Option<UploadedFile> = None;
        match &self.listing {
            ListingState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("加载中…");
                });
            }
            ListingState::Failed(message) => {
                ui.colored_label(COLOR_ERR, format!("获取文件列表失败: {message}"));
            }
            ListingState::Loaded(files) if files.is_empty() => {
                ui.label("暂无已上传的文件");
            }
            ListingState::Loaded(files) => {
                egui::ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                    for file in files {
                        ui.horizontal(|ui| {
                            ui.label("🎬");
                            ui.label(&file.name);
                            if ui.small_button("▶ 播放").clicked() {
                                to_open = Some(file.clone());
                            }
                        });
                        ui.add_space(4.0);
                    }
                });
            }
        }
        if let Some(file) = to_open {
            self.open_file(&file);
        }
    }
}
