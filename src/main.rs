//! A man-in-the-middle proxy for the game's client/server protocol.
//!
//! Every message in both directions is decoded on its way through. Chat lines the
//! client sends that start with `!` are treated as commands for the proxy itself
//! and never reach the server.
mod config;
mod relay;
mod session;
mod stream;

use ::command::Registry;
use ::once_cell::sync::OnceCell;
use ::tokio::net::TcpListener;
use ::tracing_appender::non_blocking::WorkerGuard;
use ::tracing_subscriber::layer::SubscriberExt;
use ::tracing_subscriber::util::SubscriberInitExt;
use ::tracing_subscriber::{fmt, EnvFilter};
use config::Config;

/// Built once before the first session starts, then only read.
static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// The returned guard flushes the log file when dropped.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) = ::tracing_appender::non_blocking(::tracing_appender::rolling::daily(dir, "gtproxy.log"));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        },
        None => (None, None),
    };
    ::tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    guard
}

#[::tokio::main]
async fn main() -> Result<(), Box<dyn ::std::error::Error>> {
    use ::clap::Parser;
    let config = Config::parse();
    let _guard = init_logging(&config);

    let registry = REGISTRY.get_or_try_init(Registry::with_builtins)?;
    ::tracing::info!(commands = registry.len(), "command registry ready");

    let listener = TcpListener::bind(config.listen).await?;
    ::tracing::info!("listening on {}, relaying to {}", config.listen, config.upstream);
    let mut next_id = 0u64;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                next_id += 1;
                ::tracing::info!("starting new session {} for {}", next_id, addr);
                let upstream = config.upstream;
                let max_len = config.max_message_len;
                let id = next_id;
                ::tokio::spawn(async move {
                    match session::start_session(id, stream, upstream, registry, max_len).await {
                        Ok(()) => ::tracing::info!("session {} closed", id),
                        Err(e) => ::tracing::warn!("session {} ended: {}", id, e),
                    }
                });
            },
            Err(e) => {
                ::tracing::warn!("failed to accept a connection: {:?}", e);
            },
        }
    }
}
