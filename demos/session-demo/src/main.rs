//! Walks one session through its lifecycle: sign in, stay busy for a few
//! seconds, go idle, get forced out, and land on the login view with the
//! inactivity notice.
//!
//! ```text
//! RAILPASS_SESSION_TIMEOUT_MS=3000 cargo run -p session-demo
//! RAILPASS_API_URL=http://localhost:8080/api cargo run -p session-demo
//! ```
//!
//! Without `RAILPASS_API_URL` the demo runs against the in-memory backend.

use std::time::Duration;

use railpass::prelude::*;
use tracing::info;

const TIMEOUT_ENV: &str = "RAILPASS_SESSION_TIMEOUT_MS";
const DEMO_TIMEOUT_MS: u64 = 3_000;
const DEMO_PHONE: &str = "13800138000";
const DEMO_PASSWORD: &str = "password123";

fn session_config() -> SessionConfig {
    let timeout_ms = std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEMO_TIMEOUT_MS);
    SessionConfig {
        session_timeout_ms: timeout_ms,
        ..SessionConfig::default()
    }
}

fn demo_account() -> Registration {
    Registration {
        phone_number: DEMO_PHONE.into(),
        password: DEMO_PASSWORD.into(),
        real_name: Some("Zhang San".into()),
        email: Some("zhang@example.com".into()),
        ..Registration::default()
    }
}

fn provider(navigator: HistoryNavigator) -> Result<SessionProvider, RailpassError> {
    let builder = SessionProvider::builder()
        .config(session_config())
        .navigator(navigator);

    if std::env::var_os(HttpConfig::BASE_URL_ENV).is_some() {
        let backend = HttpAuthBackend::new(HttpConfig::from_env())?;
        info!(base_url = backend.base_url(), "using HTTP auth backend");
        builder.build(backend)
    } else {
        info!("using in-memory auth backend");
        builder.build(MemoryAuthBackend::new().with_account(demo_account()))
    }
}

async fn run(navigator: HistoryNavigator) -> Result<(), RailpassError> {
    let session = use_session();
    let timeout = session.config().session_timeout();

    if let Some(notice) = session.take_timeout_notice() {
        info!(at = ?notice.timed_out_at, "stale timeout notice discarded");
    }

    let user = session
        .login(&Credentials::new(DEMO_PHONE, DEMO_PASSWORD))
        .await?;
    info!(user = ?user.id(), timeout_ms = session.config().session_timeout_ms, "signed in");

    // Busy for a while: input arrives faster than the timeout.
    let hub = session.activity();
    let step = timeout / 2;
    for event in [UiEvent::PointerMove, UiEvent::Click, UiEvent::KeyPress] {
        tokio::time::sleep(step).await;
        hub.dispatch(event);
        info!(%event, "user active");
    }

    if let serde_json::Value::Object(partial) = serde_json::json!({ "preferredSeat": "window" }) {
        session.update_user(partial)?;
    }

    // Then idle until the session is forced out.
    info!("user idle");
    let mut state = session.subscribe();
    if state.wait_for(|s| !s.is_authenticated).await.is_err() {
        return Ok(());
    }
    tokio::time::sleep(REDIRECT_DELAY + Duration::from_millis(50)).await;

    // The login view renders.
    let location = navigator.current().unwrap_or_else(|| "/".into());
    match session.take_timeout_notice() {
        Some(notice) => info!(
            %location,
            at = ?notice.timed_out_at,
            "login view: you were signed out after a period of inactivity"
        ),
        None => info!(%location, "login view"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), RailpassError> {
    init_tracing();

    let navigator = HistoryNavigator::new();
    let provider = provider(navigator.clone())?;
    provider.bootstrap().await;
    provider.scope(run(navigator)).await
}
