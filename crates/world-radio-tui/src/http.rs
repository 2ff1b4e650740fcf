use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use world_radio_proto::protocol::{ApiState, RemoteCommand};

/// Snapshot shared with the UI. The app writes it after every state change.
pub type SharedApiState = Arc<RwLock<ApiState>>;

#[derive(Clone)]
struct HttpState {
    api_state: SharedApiState,
    cmd_tx: mpsc::Sender<RemoteCommand>,
}

#[derive(Serialize)]
struct VolumeStatus {
    volume: u8,
    muted: bool,
}

pub fn router(api_state: SharedApiState, cmd_tx: mpsc::Sender<RemoteCommand>) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/country/:code", get(select_country).post(select_country))
        .route("/api/station/:idx", get(play_station).post(play_station))
        .route("/api/toggle", get(toggle).post(toggle))
        .route("/api/mute", get(mute).post(mute))
        .route("/api/volume/:volume", get(set_volume).post(set_volume))
        .route("/api/volume", get(get_volume))
        .with_state(HttpState { api_state, cmd_tx })
}

pub fn start_server(
    bind_address: String,
    port: u16,
    api_state: SharedApiState,
    cmd_tx: mpsc::Sender<RemoteCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(api_state, cmd_tx);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn snapshot(state: &HttpState) -> ApiState {
    match state.api_state.read() {
        Ok(s) => s.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

async fn send(state: &HttpState, cmd: RemoteCommand) -> StatusCode {
    if state.cmd_tx.send(cmd).await.is_err() {
        error!("HTTP API: UI is gone, command dropped");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

async fn get_state(State(state): State<HttpState>) -> Json<ApiState> {
    Json(snapshot(&state))
}

async fn select_country(State(state): State<HttpState>, Path(code): Path<String>) -> StatusCode {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return StatusCode::BAD_REQUEST;
    }
    info!("HTTP API: select country {}", code);
    send(&state, RemoteCommand::SelectCountry { code }).await
}

async fn play_station(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    if idx >= snapshot(&state).selection.stations.len() {
        return StatusCode::NOT_FOUND;
    }
    info!("HTTP API: play station {}", idx);
    send(&state, RemoteCommand::PlayStation { idx }).await
}

async fn toggle(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: toggle play");
    send(&state, RemoteCommand::TogglePlay).await
}

async fn mute(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: toggle mute");
    send(&state, RemoteCommand::ToggleMute).await
}

async fn set_volume(State(state): State<HttpState>, Path(volume): Path<i32>) -> StatusCode {
    let value = (volume as f32 / 100.0).clamp(0.0, 1.0);
    info!("HTTP API: set volume to {}%", volume);
    send(&state, RemoteCommand::Volume { value }).await
}

async fn get_volume(State(state): State<HttpState>) -> Json<VolumeStatus> {
    let playback = snapshot(&state).playback;
    Json(VolumeStatus {
        volume: (playback.volume * 100.0).round() as u8,
        muted: playback.is_muted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use world_radio_proto::protocol::Station;

    fn setup() -> (Router, SharedApiState, mpsc::Receiver<RemoteCommand>) {
        let api_state: SharedApiState = Arc::new(RwLock::new(ApiState::default()));
        let (tx, rx) = mpsc::channel(8);
        (router(api_state.clone(), tx), api_state, rx)
    }

    async fn call(app: Router, method: &str, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn country_route_forwards_uppercased_code() {
        let (app, _state, mut rx) = setup();
        let resp = call(app, "POST", "/api/country/fr").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            rx.recv().await,
            Some(RemoteCommand::SelectCountry { code: "FR".into() })
        );
    }

    #[tokio::test]
    async fn malformed_country_code_is_rejected() {
        let (app, _state, mut rx) = setup();
        let resp = call(app, "GET", "/api/country/france").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn station_index_is_checked_against_listing() {
        let (app, state, mut rx) = setup();
        let resp = call(app.clone(), "POST", "/api/station/0").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        state.write().unwrap().selection.stations.push(Station {
            id: "a".into(),
            ..Default::default()
        });
        let resp = call(app, "POST", "/api/station/0").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(rx.recv().await, Some(RemoteCommand::PlayStation { idx: 0 }));
    }

    #[tokio::test]
    async fn volume_is_clamped_and_reported() {
        let (app, state, mut rx) = setup();
        let resp = call(app.clone(), "POST", "/api/volume/150").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(rx.recv().await, Some(RemoteCommand::Volume { value: 1.0 }));

        state.write().unwrap().playback.volume = 0.42;
        let resp = call(app, "GET", "/api/volume").await;
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["volume"], 42);
        assert_eq!(json["muted"], false);
    }

    #[tokio::test]
    async fn state_route_serves_snapshot() {
        let (app, state, _rx) = setup();
        {
            let mut s = state.write().unwrap();
            s.rev = 7;
            s.selection.country_code = Some("JP".into());
        }
        let resp = call(app, "GET", "/api/state").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["rev"], 7);
        assert_eq!(json["selection"]["country_code"], "JP");
    }

    #[tokio::test]
    async fn closed_ui_yields_unavailable() {
        let (app, _state, rx) = setup();
        drop(rx);
        let resp = call(app, "POST", "/api/toggle").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
