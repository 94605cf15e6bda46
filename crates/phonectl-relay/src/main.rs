use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use phonectl_common::Result;
use phonectl_config::{validation, LoggingConfig, RelayConfig};
use phonectl_relay::reaper::spawn_reaper;
use phonectl_relay::{serve, ConnectionSettings, Registry};

#[derive(Parser)]
#[command(name = "phonectl-relay", about = "WebSocket relay pairing phones with desktop agents")]
struct Args {
    /// Config file (default: <config dir>/phonectl/relay.toml if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides config and $PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind. Overrides config and $RELAY_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Seconds before an unused pairing token is forgotten.
    #[arg(long)]
    entry_ttl: Option<u64>,

    /// Write a documented default config to this path and exit.
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(ttl) = self.entry_ttl {
            config.registry.entry_ttl_secs = ttl;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.init_config {
        phonectl_config::create_default_config(path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    // Config loading logs through a bootstrap subscriber; the configured
    // one is only known afterwards.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(log_filter("info"))
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || effective_config(&args))?;

    if args.print_config {
        println!("{}", phonectl_config::config_to_json(&config));
        return Ok(());
    }

    init_logging(&config.logging);

    let registry = Registry::new();
    let addr = config.server.bind_addr();
    let listener = bind(&addr).await?;

    tracing::info!("phonectl-relay listening on {}", addr);

    let reaper = spawn_reaper(
        registry.clone(),
        Duration::from_secs(config.registry.entry_ttl_secs),
        Duration::from_secs(config.registry.reap_interval_secs),
    );

    serve(
        listener,
        registry,
        ConnectionSettings::from(&config),
        shutdown_signal(),
    )
    .await;

    reaper.abort();
    Ok(())
}

/// File, then environment, then command line, validated as a whole.
fn effective_config(args: &Args) -> Result<RelayConfig> {
    let mut config = phonectl_config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.to_ascii_lowercase();
        EnvFilter::new(format!("phonectl_relay={level},phonectl_config={level}"))
    })
}

fn init_logging(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(log_filter(&logging.level));
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await.inspect_err(|e| {
        tracing::error!(error = %e, "failed to bind {}", addr);
    })?;
    Ok(listener)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use phonectl_common::RelayError;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn config_loading_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let args = Args::parse_from(["phonectl-relay", "--config", path.to_str().unwrap()]);

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("phonectl_config=info"))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let config =
            tracing::subscriber::with_default(subscriber, || effective_config(&args)).unwrap();

        let logged = capture.text();
        assert!(logged.contains("loaded config from"));
        assert!(logged.contains(path.to_str().unwrap()));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn cli_flags_override_config() {
        let args = Args::parse_from(["phonectl-relay", "--port", "9300", "--entry-ttl", "120"]);
        let mut config = RelayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, 9300);
        assert_eq!(config.registry.entry_ttl_secs, 120);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[tokio::test]
    async fn bind_failure_is_an_io_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = bind(&addr).await.unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
        assert_eq!(err.code(), "io_error");
    }
}
