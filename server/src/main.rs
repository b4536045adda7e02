use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

mod api;
mod boards;
mod handlers;
mod logic;
mod state;
mod storage;

use crate::api::{list_strokes, store_stroke};
use crate::boards::save_dirty_boards;
use crate::handlers::{board_handler, ping_handler, root_handler, ws_handler};
use crate::state::AppState;
use crate::storage::{FileStorage, S3Storage, S3StorageConfig, Storage};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    #[arg(long)]
    public_dir: Option<PathBuf>,
    #[arg(long, env = "DOODLEBOARD_DOCUMENT_DIR")]
    document_dir: Option<PathBuf>,
    #[arg(long, env = "DOODLEBOARD_SAVE_INTERVAL_SECS", default_value_t = 60)]
    save_interval_secs: u64,
    #[arg(long, env = "DOODLEBOARD_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,
    #[arg(long, env = "DOODLEBOARD_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,
    #[arg(long, env = "DOODLEBOARD_S3_BUCKET")]
    s3_bucket: Option<String>,
    #[arg(long, env = "DOODLEBOARD_S3_PREFIX")]
    s3_prefix: Option<String>,
    #[arg(long, env = "DOODLEBOARD_S3_REGION")]
    s3_region: Option<String>,
    #[arg(long, env = "DOODLEBOARD_S3_ENDPOINT_URL")]
    s3_endpoint_url: Option<String>,
    #[arg(long, env = "DOODLEBOARD_S3_FORCE_PATH_STYLE")]
    s3_force_path_style: bool,
    #[arg(long, env = "DOODLEBOARD_S3_ACCESS_KEY_ID")]
    s3_access_key_id: Option<String>,
    #[arg(long, env = "DOODLEBOARD_S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    s3_secret_access_key: Option<String>,
}

async fn build_storage(args: &Args) -> std::io::Result<Arc<dyn Storage>> {
    if let Some(bucket) = args.s3_bucket.clone() {
        let config = S3StorageConfig {
            prefix: args.s3_prefix.clone(),
            region: args.s3_region.clone(),
            endpoint_url: args.s3_endpoint_url.clone(),
            force_path_style: args.s3_force_path_style,
            access_key_id: args.s3_access_key_id.clone(),
            secret_access_key: args.s3_secret_access_key.clone(),
            ..S3StorageConfig::new(bucket)
        };
        return Ok(Arc::new(S3Storage::new(config).await));
    }
    let document_dir = args
        .document_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../documents"));
    Ok(Arc::new(FileStorage::new(document_dir).await?))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let storage = match build_storage(&args).await {
        Ok(storage) => storage,
        Err(err) => {
            error!("Failed to prepare document storage: {err}");
            std::process::exit(1);
        }
    };
    info!("Persisting boards to {}", storage.describe());
    let state = AppState::new(storage, Duration::from_secs(args.save_interval_secs.max(1)));
    let backup_state = state.clone();

    let public_dir = args
        .public_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    let index_file = public_dir.join("index.html");

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .route("/b/:board_id", get(board_handler))
        .route("/ws/:board_id", get(ws_handler))
        .route(
            "/api/boards/:board_id/strokes",
            get(list_strokes).post(store_stroke),
        )
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(axum::Extension(index_file))
        .with_state(state);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(backup_state.save_interval);
        loop {
            interval.tick().await;
            save_dirty_boards(&backup_state).await;
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    if let (Some(cert), Some(key)) = (args.tls_cert.as_ref(), args.tls_key.as_ref()) {
        let tls = match axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await {
            Ok(tls) => tls,
            Err(err) => {
                error!("Failed to load TLS certificate: {err}");
                std::process::exit(1);
            }
        };
        info!("Whiteboard running at https://localhost:{}", args.port);
        if let Err(err) = axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await
        {
            error!("Server crashed: {err}");
        }
        return;
    }

    info!("Whiteboard running at http://localhost:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server crashed: {err}");
    }
}
