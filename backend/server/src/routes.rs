use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    error::{AppError, RegisterError},
    reader::current_count,
    registrar::register,
    state::AppState,
};

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub count: u64,
    pub ok: bool,
}

pub async fn count_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = current_count(state.backend.as_ref()).await;

    ([(CACHE_CONTROL, "no-store")], Json(CountResponse { count }))
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RegisterResponse>, AppError> {
    let session_id = session_id_from_body(&body)?;

    match register(state.backend.as_ref(), state.verifier.as_ref(), &session_id).await {
        Ok(registration) => Ok(Json(RegisterResponse {
            count: registration.count,
            ok: registration.registered,
        })),
        Err(RegisterError::InvalidInput) => Err(AppError::MalformedPayload),
        Err(e) => {
            // entry simply goes uncounted, the success page must still load
            warn!("Entry not counted: {e}");
            Ok(Json(RegisterResponse {
                count: 0,
                ok: false,
            }))
        }
    }
}

fn session_id_from_body(body: &Bytes) -> Result<String, AppError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        error!("Undecodable register body: {e}");
        AppError::UnexpectedFailure(e.to_string())
    })?;

    match payload.get("session_id") {
        Some(Value::String(session_id)) if !session_id.is_empty() => Ok(session_id.clone()),
        _ => Err(AppError::MalformedPayload),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        backend::{Backend, Unconfigured, memory::MemoryBackend},
        config::Config,
        router,
        verify::TrustRedirect,
    };

    fn app(backend: Arc<dyn Backend>) -> Router {
        let state = AppState {
            config: Config::from_lookup(|_| None).unwrap(),
            backend,
            verifier: Arc::new(TrustRedirect),
        };

        router(Arc::new(state))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn count_request() -> Request<Body> {
        Request::get("/count").body(Body::empty()).unwrap()
    }

    fn register_request(body: impl Into<Body>) -> Request<Body> {
        Request::post("/register-entry")
            .header(CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn register_json(body: Value) -> Request<Body> {
        register_request(body.to_string())
    }

    #[tokio::test]
    async fn test_fresh_backend_scenario() {
        let app = app(Arc::new(MemoryBackend::default()));

        assert_eq!(send(&app, count_request()).await, (StatusCode::OK, json!({ "count": 0 })));

        for (session, expected) in [("sess_A", 1), ("sess_B", 2), ("sess_A", 2)] {
            let (status, body) = send(&app, register_json(json!({ "session_id": session }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "count": expected, "ok": true }));
        }

        assert_eq!(send(&app, count_request()).await, (StatusCode::OK, json!({ "count": 2 })));
    }

    #[tokio::test]
    async fn test_count_is_not_cached() {
        let app = app(Arc::new(MemoryBackend::default()));

        let response = app.oneshot(count_request()).await.unwrap();

        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_unconfigured_backend_degrades() {
        let app = app(Arc::new(Unconfigured));

        assert_eq!(send(&app, count_request()).await, (StatusCode::OK, json!({ "count": 0 })));

        let (status, body) = send(&app, register_json(json!({ "session_id": "sess_1" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "count": 0, "ok": false }));
    }

    #[tokio::test]
    async fn test_bad_session_ids_touch_nothing() {
        let backend = Arc::new(MemoryBackend::default());
        let app = app(backend.clone());

        for body in [
            json!({}),
            json!({ "session_id": null }),
            json!({ "session_id": "" }),
            json!({ "session_id": 42 }),
            json!({ "session_id": ["sess_A"] }),
            json!("sess_A"),
        ] {
            let (status, reply) = send(&app, register_json(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply, json!({ "error": "session_id required" }));
        }

        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let backend = Arc::new(MemoryBackend::default());
        let app = app(backend.clone());

        let (status, body) = send(&app, register_request("session_id=sess_A")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "count": 0, "ok": false }));
        assert_eq!(backend.calls(), 0);
    }
}
