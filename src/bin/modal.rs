//! VidBay modal client binary.
//!
//! Owns the tokio runtime the queue spawns transfers on and hands the UI a
//! handle to it; the eframe event loop runs on the main thread.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use vidbay::client::ApiClient;
use vidbay::config::ModalArgs;
use vidbay::logging;
use vidbay::modal::FileCenterModal;
use vidbay::queue::{QueueConfig, UploadQueue};

fn main() {
    logging::init_logging();

    let args = ModalArgs::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let client = Arc::new(ApiClient::new(args.server_url.clone()));
    let queue = UploadQueue::new(
        client.clone(),
        QueueConfig {
            max_concurrent: args.max_concurrent,
            abort_on_cancel: args.abort_on_cancel,
        },
        runtime.handle().clone(),
    );

    info!(
        server = args.server_url,
        max_concurrent = args.max_concurrent,
        "starting modal client"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 640.0])
            .with_min_inner_size([480.0, 480.0]),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    let result = eframe::run_native(
        "文件中心",
        options,
        Box::new(move |_cc| Box::new(FileCenterModal::new(client, queue, handle))),
    );
    if let Err(err) = result {
        error!(error = %err, "failed to start UI");
        std::process::exit(1);
    }
}
