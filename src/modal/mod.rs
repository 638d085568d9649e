//! 文件中心窗口：两种视图 + 任务列表，动作全部转发给队列与客户端。

mod state;
mod ui;

pub use state::{ListingState, ModalMode, Notice};

use eframe::{App, egui};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

use crate::client::{ApiClient, TransferError, UploadedFile};
use crate::queue::{TaskId, TaskSnapshot, TaskStatus, UploadQueue};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];

const NOTICE_TTL: Duration = Duration::from_secs(4);

type ListingReceiver = std_mpsc::Receiver<Result<Vec<UploadedFile>, TransferError>>;

pub struct FileCenterModal {
    client: Arc<ApiClient>,
    queue: Arc<UploadQueue>,
    runtime: Handle,
    mode: ModalMode,
    tasks_rx: watch::Receiver<Vec<TaskSnapshot>>,
    tasks: Vec<TaskSnapshot>,
    listing: ListingState,
    listing_rx: Option<ListingReceiver>,
    announced: HashSet<TaskId>,
    notice: Option<Notice>,
}

impl FileCenterModal {
    pub fn new(client: Arc<ApiClient>, queue: Arc<UploadQueue>, runtime: Handle) -> Self {
        let tasks_rx = queue.subscribe();
        let mut modal = Self {
            client,
            queue,
            runtime,
            mode: ModalMode::List,
            tasks_rx,
            tasks: Vec::new(),
            listing: ListingState::default(),
            listing_rx: None,
            announced: HashSet::new(),
            notice: None,
        };
        // 打开即进入列表视图并拉取一次。
        modal.refresh_listing();
        modal
    }

    fn set_mode(&mut self, mode: ModalMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        if mode == ModalMode::List {
            self.refresh_listing();
        }
    }

    fn refresh_listing(&mut self) {
        debug!("refreshing uploaded file listing");
        let (sender, receiver) = std_mpsc::channel();
        self.listing = ListingState::Loading;
        self.listing_rx = Some(receiver);
        let client = Arc::clone(&self.client);
        self.runtime.spawn(async move {
            let result = client.list().await;
            let _ = sender.send(result);
        });
    }

    fn pick_files(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("视频文件", VIDEO_EXTENSIONS)
            .pick_files();
        if let Some(paths) = picked {
            for path in paths {
                self.queue.enqueue(path);
            }
        }
    }

    fn remove_task(&mut self, id: TaskId) {
        self.queue.cancel(id);
    }

    fn open_file(&mut self, file: &UploadedFile) {
        if let Err(err) = open::that(self.client.file_url(file)) {
            self.set_notice(format!("无法打开 {}: {err}", file.name), true);
        }
    }

    fn set_notice(&mut self, text: String, is_error: bool) {
        self.notice = Some(Notice {
            text,
            is_error,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    /// 每帧驱动：同步任务快照、收取列表拉取结果、过期通知。
    fn poll(&mut self) {
        if self.tasks_rx.has_changed().unwrap_or(false) {
            self.tasks = self.tasks_rx.borrow_and_update().clone();
        }

        let mut newly_settled = Vec::new();
        for task in &self.tasks {
            if self.announced.contains(&task.id) {
                continue;
            }
            match &task.status {
                TaskStatus::Done(_) => {
                    newly_settled.push((task.id, format!("{} 上传成功", task.file_name), false));
                }
                TaskStatus::Error(message) => {
                    newly_settled.push((
                        task.id,
                        format!("{} 上传失败: {message}", task.file_name),
                        true,
                    ));
                }
                _ => {}
            }
        }
        for (id, text, is_error) in newly_settled {
            self.announced.insert(id);
            self.set_notice(text, is_error);
        }

        if let Some(receiver) = self.listing_rx.take() {
            match receiver.try_recv() {
                Ok(Ok(files)) => self.listing = ListingState::Loaded(files),
                Ok(Err(err)) => self.listing = ListingState::Failed(err.to_string()),
                // 结果未就绪，下一帧继续收取。
                Err(std_mpsc::TryRecvError::Empty) => self.listing_rx = Some(receiver),
                Err(std_mpsc::TryRecvError::Disconnected) => {
                    self.listing = ListingState::Failed("获取文件列表失败".to_string());
                }
            }
        }

        if let Some(notice) = &self.notice {
            if Instant::now() >= notice.expires_at {
                self.notice = None;
            }
        }
    }
}

impl App for FileCenterModal {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll();
        self.render(ctx);
        // 任务快照与列表结果来自其他线程，保持低频重绘以便及时反映。
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}
