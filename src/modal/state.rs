use std::time::Instant;

use crate::client::UploadedFile;

/// 两种互斥的视图：查看已上传 / 上传新文件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    List,
    Upload,
}

/// 列表视图的拉取状态；每次进入列表视图都重新拉取。
pub enum ListingState {
    Loading,
    Loaded(Vec<UploadedFile>),
    Failed(String),
}

impl Default for ListingState {
    fn default() -> Self {
        Self::Loading
    }
}

/// 短暂展示的提示条。
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    pub expires_at: Instant,
}
