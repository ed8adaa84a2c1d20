use std::process::ExitCode;

use coi_serve::config::Config;
use coi_serve::error::ServerError;
use coi_serve::logger;
use coi_serve::server::{Server, ShutdownSignal};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = Config::load()?;
    logger::init(&cfg.logging)?;

    // 创建 Tokio 运行时，根据 workers 配置设置线程数
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers.filter(|w| *w > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let server = Server::bind(cfg)?;
    // handlers go in before the banner; a signal after it must exit cleanly
    let shutdown = ShutdownSignal::register()?;
    logger::log_server_start(&server.local_addr()?);

    server
        .run_until(async {
            let signal = shutdown.recv().await;
            logger::log_shutdown(signal);
        })
        .await
}
