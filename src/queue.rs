//! 上传任务队列：固定并发上限下的 FIFO 调度与任务生命周期。
//!
//! 队列持有全部任务状态，UI 只消费快照；传输由注入的 [`UploadTransport`]
//! 执行，便于测试时替换为手动控制的假传输。

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{TransferError, UploadedFile};
use crate::config::MAX_CONCURRENT_UPLOADS;

/// 任务标识，enqueue 时分配，UI 与队列共用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 任务状态，只会单向推进：Waiting → Uploading → Done | Error。
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Waiting,
    Uploading,
    Done(UploadedFile),
    Error(String),
}

/// 推送给 UI 的任务视图。
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub file_name: String,
    pub status: TaskStatus,
}

/// 执行单个文件传输的抽象；真实实现为 [`crate::client::ApiClient`]。
#[async_trait]
pub trait UploadTransport: Send + Sync + 'static {
    async fn upload(&self, path: &Path) -> Result<UploadedFile, TransferError>;
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_concurrent: usize,
    /// 移除上传中任务时是否中止传输；默认保留原始行为：
    /// 传输继续在服务端完成，结果被丢弃。
    pub abort_on_cancel: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_UPLOADS,
            abort_on_cancel: false,
        }
    }
}

struct TaskEntry {
    id: TaskId,
    path: PathBuf,
    file_name: String,
    status: TaskStatus,
    abort: Option<AbortHandle>,
}

#[derive(Default)]
struct QueueInner {
    tasks: Vec<TaskEntry>,
    waiting: VecDeque<TaskId>,
    /// 在途任务集合即并发计数：len() 即计数值，移除即唯一的释放点。
    in_flight: HashSet<TaskId>,
}

impl QueueInner {
    fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskEntry> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .iter()
            .map(|task| TaskSnapshot {
                id: task.id,
                file_name: task.file_name.clone(),
                status: task.status.clone(),
            })
            .collect()
    }
}

pub struct UploadQueue {
    transport: Arc<dyn UploadTransport>,
    config: QueueConfig,
    runtime: Handle,
    inner: Mutex<QueueInner>,
    snapshot_tx: watch::Sender<Vec<TaskSnapshot>>,
}

impl UploadQueue {
    pub fn new(
        transport: Arc<dyn UploadTransport>,
        config: QueueConfig,
        runtime: Handle,
    ) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Arc::new(Self {
            transport,
            config,
            runtime,
            inner: Mutex::new(QueueInner::default()),
            snapshot_tx,
        })
    }

    /// 订阅任务列表快照；每次状态变化后推送。
    pub fn subscribe(&self) -> watch::Receiver<Vec<TaskSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    pub fn tasks(&self) -> Vec<TaskSnapshot> {
        self.lock().snapshot()
    }

    /// 追加到等待队列尾部并立即尝试准入。
    pub fn enqueue(self: &Arc<Self>, path: PathBuf) -> TaskId {
        let id = TaskId(Uuid::new_v4());
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut inner = self.lock();
        debug!(task = %id, file = file_name, "task enqueued");
        inner.tasks.push(TaskEntry {
            id,
            path,
            file_name,
            status: TaskStatus::Waiting,
            abort: None,
        });
        inner.waiting.push_back(id);
        self.pump(&mut inner);
        self.publish(&inner);
        id
    }

    /// 移除任务。等待中的任务直接出队，不产生任何传输；上传中的任务
    /// 按 `abort_on_cancel` 决定是中止传输还是仅停止跟踪。
    pub fn cancel(self: &Arc<Self>, id: TaskId) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.tasks.iter().position(|task| task.id == id) else {
            return false;
        };

        let is_waiting = matches!(inner.tasks[index].status, TaskStatus::Waiting);
        let is_uploading = matches!(inner.tasks[index].status, TaskStatus::Uploading);
        let entry = inner.tasks.remove(index);

        if is_waiting {
            inner.waiting.retain(|waiting| *waiting != id);
            info!(task = %id, file = entry.file_name, "waiting task removed");
        } else if is_uploading {
            if self.config.abort_on_cancel {
                if inner.in_flight.remove(&id) {
                    if let Some(abort) = entry.abort {
                        abort.abort();
                    }
                    info!(task = %id, file = entry.file_name, "in-flight transfer aborted");
                    self.pump(&mut inner);
                }
            } else {
                // 传输继续在服务端完成，槽位由其 settle 释放。
                info!(task = %id, file = entry.file_name, "task untracked, transfer left running");
            }
        }

        self.publish(&inner);
        true
    }

    /// 准入检查：只要并发未满且还有等待任务，就按 FIFO 依次放行。
    fn pump(self: &Arc<Self>, inner: &mut QueueInner) {
        while inner.in_flight.len() < self.config.max_concurrent {
            let Some(id) = inner.waiting.pop_front() else {
                break;
            };
            let Some(entry) = inner.task_mut(id) else {
                continue;
            };
            entry.status = TaskStatus::Uploading;
            let path = entry.path.clone();
            let file_name = entry.file_name.clone();

            inner.in_flight.insert(id);
            info!(task = %id, file = file_name, "transfer admitted");

            let queue = Arc::clone(self);
            let transport = Arc::clone(&self.transport);
            let join = self.runtime.spawn(async move {
                let outcome = transport.upload(&path).await;
                queue.settle(id, outcome);
            });
            if let Some(entry) = inner.task_mut(id) {
                entry.abort = Some(join.abort_handle());
            }
        }
    }

    /// 传输终结：恰好释放一个槽位，记录终态，再次准入。
    fn settle(self: &Arc<Self>, id: TaskId, outcome: Result<UploadedFile, TransferError>) {
        let mut inner = self.lock();
        if !inner.in_flight.remove(&id) {
            // 槽位已在 abort_on_cancel 的 cancel 中回收。
            return;
        }

        match inner.task_mut(id) {
            Some(entry) => {
                entry.abort = None;
                entry.status = match outcome {
                    Ok(file) => {
                        info!(task = %id, name = file.name, "transfer done");
                        TaskStatus::Done(file)
                    }
                    Err(err) => {
                        warn!(task = %id, error = %err, "transfer failed");
                        TaskStatus::Error(err.to_string())
                    }
                };
            }
            None => {
                debug!(task = %id, "task removed mid-flight, result discarded");
            }
        }

        self.pump(&mut inner);
        self.publish(&inner);
    }

    fn publish(&self, inner: &QueueInner) {
        self.snapshot_tx.send_replace(inner.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
