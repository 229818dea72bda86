#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use visitlog_api::config::ServerConfig;
use visitlog_api::router::build_app_router;
use visitlog_api::state::AppState;
use visitlog_api::store::VisitStore;
use visitlog_client::api::BackendApi;
use visitlog_client::session::{Credential, SessionContext};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Requests the backend should refuse with 503 before they reach a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// Only `GET /admin/companies` fails.
    ListFails,
    /// Every request fails.
    AllFail,
}

impl Fault {
    fn rejects(self, request: &Request) -> bool {
        match self {
            Fault::None => false,
            Fault::ListFails => {
                request.method() == Method::GET && request.uri().path() == "/admin/companies"
            }
            Fault::AllFail => true,
        }
    }
}

/// A reference backend listening on an ephemeral local port.
pub struct TestBackend {
    pub base_url: String,
    /// Direct handle on the backend's records for assertions.
    pub store: Arc<VisitStore>,
    fault: Arc<Mutex<Fault>>,
    scan_requests: Arc<AtomicUsize>,
}

impl TestBackend {
    pub fn api(&self) -> BackendApi {
        BackendApi::new(&self.base_url)
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    /// `POST /student/scan` requests received so far, counted on arrival.
    pub fn scan_requests(&self) -> usize {
        self.scan_requests.load(Ordering::SeqCst)
    }
}

/// Start the reference backend in the background.
pub async fn spawn_backend() -> TestBackend {
    spawn_backend_with_scan_delay(Duration::ZERO).await
}

/// Start the reference backend, holding every scan report for `delay`
/// before it reaches the store.
pub async fn spawn_backend_with_scan_delay(delay: Duration) -> TestBackend {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 30,
        admin_token: Some(ADMIN_TOKEN.to_string()),
    };
    let state = AppState::new(config.clone());
    let store = Arc::clone(&state.store);
    let fault = Arc::new(Mutex::new(Fault::None));
    let scan_requests = Arc::new(AtomicUsize::new(0));

    let gate = {
        let fault = Arc::clone(&fault);
        let scan_requests = Arc::clone(&scan_requests);
        move |request: Request, next: Next| {
            let fault = Arc::clone(&fault);
            let scan_requests = Arc::clone(&scan_requests);
            async move {
                let active = *fault.lock().unwrap();
                if active.rejects(&request) {
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                if request.uri().path() == "/student/scan" {
                    scan_requests.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                }
                next.run(request).await
            }
        }
    };
    let app = build_app_router(state, &config).layer(middleware::from_fn(gate));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend {
        base_url: format!("http://{addr}"),
        store,
        fault,
        scan_requests,
    }
}

/// Client for a port nothing listens on.
pub fn unreachable_api() -> BackendApi {
    // Bind then drop to find a free port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    BackendApi::new(format!("http://{addr}"))
}

pub fn admin_session() -> SessionContext {
    SessionContext::new().with_credential(Credential::new(ADMIN_TOKEN).unwrap())
}
