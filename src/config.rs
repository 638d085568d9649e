//! CLI arguments and shared configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

/// 上传并发上限，与前端提示文案保持一致。
pub const MAX_CONCURRENT_UPLOADS: usize = 4;
pub const DEFAULT_HTTP_PORT: u16 = 3001;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3001";
pub const DEFAULT_UPLOAD_MAX_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// CLI arguments and environment configuration for the server binary.
#[derive(Parser, Debug)]
#[command(name = "vidbay-server", version = VERSION_INFO, about = "VidBay upload server")]
pub struct ServerArgs {
    #[arg(
        short = 'b',
        long,
        env = "VIDBAY_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "VIDBAY_PORT",
        default_value_t = DEFAULT_HTTP_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        short = 'u',
        long,
        env = "VIDBAY_UPLOAD_DIR",
        default_value = DEFAULT_UPLOAD_DIR,
        help = "Directory where uploaded files are stored"
    )]
    pub upload_dir: String,
    #[arg(
        long,
        env = "VIDBAY_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload body size in bytes (0 to disable)"
    )]
    pub upload_max_size: usize,
    #[arg(
        long,
        env = "VIDBAY_CORS_ORIGINS",
        help = "Comma separated CORS origins (all origins allowed when unset)"
    )]
    pub cors_origins: Option<String>,
}

/// CLI arguments and environment configuration for the modal client binary.
#[derive(Parser, Debug)]
#[command(name = "vidbay-modal", version = VERSION_INFO, about = "VidBay upload client")]
pub struct ModalArgs {
    #[arg(
        short = 's',
        long,
        env = "VIDBAY_SERVER",
        default_value = DEFAULT_SERVER_URL,
        help = "Base URL of the upload server"
    )]
    pub server_url: String,
    #[arg(
        long,
        env = "VIDBAY_MAX_CONCURRENT",
        default_value_t = MAX_CONCURRENT_UPLOADS,
        help = "Max transfers in flight at once"
    )]
    pub max_concurrent: usize,
    #[arg(
        long,
        env = "VIDBAY_ABORT_ON_CANCEL",
        help = "Abort the in-flight transfer when its task is removed"
    )]
    pub abort_on_cancel: bool,
}
