use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod error;
mod pins;
mod store;

use pins::{Jitter, DEFAULT_JITTER_DEG};
use store::PinStore;

#[derive(Clone)]
struct AppState {
    store: Arc<PinStore>,
    jitter: Jitter,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    fn new(store: PinStore, jitter: Jitter, rng: StdRng) -> Self {
        Self {
            store: Arc::new(store),
            jitter,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr_raw = env::var("PINS_ADDR").unwrap_or_else(|_| "127.0.0.1:9200".to_string());
    let addr: SocketAddr = match addr_raw.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid PINS_ADDR {addr_raw:?}: {err}");
            return;
        }
    };
    let store_path = env::var("PINS_STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/pins.json"));
    let jitter = Jitter {
        max_deg: env_var_f64("PINS_JITTER_DEG", DEFAULT_JITTER_DEG),
    };

    let state = AppState::new(PinStore::new(store_path), jitter, StdRng::from_entropy());
    info!(
        store = %state.store.path().display(),
        jitter_deg = jitter.max_deg,
        "pin store configured"
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return;
        }
    };

    info!("pin server listening on http://{addr}");
    if let Err(err) = axum::serve(listener, router(state)).await {
        error!("server error: {err}");
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/pins",
            get(pins::list_pins)
                .post(pins::upsert_pin)
                .delete(pins::delete_pin),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
