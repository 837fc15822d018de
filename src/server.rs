// Citizen Registry - HTTP API
// JSON routes for the three dashboard sections, served with Axum

use crate::entities::{CitizenProfile, Demographics, NewCitizen, AADHAAR_ID_MAX_LEN};
use crate::error::RegistryError;
use crate::insights::{Advisory, BusinessInsights};
use crate::{AuthAttempt, CitizenTable, DeduplicationConflict, Enrollment, Registry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub failed_auth_alert_threshold: i64,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    Validation(String),
    NotFound(String),
    Duplicate,
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Duplicate => (
                StatusCode::CONFLICT,
                "De-duplication check failed: Biometric ID already exists!".to_string(),
            ),
            ApiError::Registry(err) => {
                let status = match err {
                    RegistryError::Conflict(_) => StatusCode::CONFLICT,
                    RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                    RegistryError::ConnectionFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
                    RegistryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!(kind = err.kind(), "{}", err);
                }
                (status, err.to_string())
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub aadhaar_id: String,
    pub biometric_hash: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub authenticated: bool,

    /// eKYC data, present only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen: Option<CitizenProfile>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    #[serde(flatten)]
    pub insights: BusinessInsights,
    pub avg_age_display: String,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub message: String,
}

fn validate_enrollment(new: &NewCitizen) -> Result<(), ApiError> {
    let id = new.aadhaar_id.as_str();
    if id.is_empty() || id.chars().count() > AADHAAR_ID_MAX_LEN {
        return Err(ApiError::Validation(format!(
            "aadhaar_id must be 1 to {AADHAAR_ID_MAX_LEN} characters"
        )));
    }
    validate_demographics(&new.demographics())?;
    if new.biometric_hash.is_empty() {
        return Err(ApiError::Validation("biometric_hash must not be empty".to_string()));
    }
    Ok(())
}

fn validate_demographics(demographics: &Demographics) -> Result<(), ApiError> {
    if demographics.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/insights - Dashboard metrics and advisories
async fn get_insights(State(state): State<AppState>) -> ApiResult<InsightsResponse> {
    let insights = state.registry.get_business_insights()?;
    let advisories = insights.advisories(state.failed_auth_alert_threshold);

    Ok(Json(ApiResponse::ok(InsightsResponse {
        avg_age_display: insights.avg_age_display(),
        insights,
        advisories,
    })))
}

/// GET /api/citizens - Enrollment history
async fn list_citizens(State(state): State<AppState>) -> ApiResult<CitizenTable> {
    Ok(Json(ApiResponse::ok(state.registry.read_all_citizens()?)))
}

/// POST /api/citizens - Enroll (de-duplication check first)
async fn create_citizen(
    State(state): State<AppState>,
    Json(mut new): Json<NewCitizen>,
) -> Result<(StatusCode, Json<ApiResponse<CitizenProfile>>), ApiError> {
    new.aadhaar_id = new.aadhaar_id.trim().to_string();
    validate_enrollment(&new)?;

    match state.registry.enroll(&new)? {
        Enrollment::Enrolled(citizen) => {
            Ok((StatusCode::CREATED, Json(ApiResponse::ok(citizen.profile()))))
        }
        Enrollment::Duplicate => Err(ApiError::Duplicate),
    }
}

/// GET /api/citizens/:id - Read one record (marker withheld)
async fn get_citizen(
    State(state): State<AppState>,
    Path(aadhaar_id): Path<String>,
) -> ApiResult<CitizenProfile> {
    match state.registry.read_citizen(&aadhaar_id)? {
        Some(citizen) => Ok(Json(ApiResponse::ok(citizen.profile()))),
        None => Err(ApiError::NotFound(
            "No record found for this Aadhaar ID.".to_string(),
        )),
    }
}

/// PUT /api/citizens/:id - Overwrite demographic fields
async fn update_citizen(
    State(state): State<AppState>,
    Path(aadhaar_id): Path<String>,
    Json(demographics): Json<Demographics>,
) -> ApiResult<MessageResponse> {
    validate_demographics(&demographics)?;

    state
        .registry
        .update_citizen(&aadhaar_id, &demographics)
        .map_err(|e| match e {
            RegistryError::NotFound(_) => ApiError::NotFound("Aadhaar ID not found.".to_string()),
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Citizen record updated successfully!".to_string(),
    })))
}

/// DELETE /api/citizens/:id - Remove a record and its auth history
async fn delete_citizen(
    State(state): State<AppState>,
    Path(aadhaar_id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let deleted = state.registry.delete_citizen(&aadhaar_id)?;
    let message = if deleted {
        "Citizen record deleted successfully."
    } else {
        "No record found for this Aadhaar ID."
    };

    Ok(Json(ApiResponse::ok(DeleteResponse {
        deleted,
        message: message.to_string(),
    })))
}

/// POST /api/authenticate - Verify marker, return eKYC data on success
async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> ApiResult<AuthResponse> {
    let authenticated = state
        .registry
        .authenticate(&req.aadhaar_id, &req.biometric_hash)?;

    let citizen = if authenticated {
        state
            .registry
            .read_citizen(&req.aadhaar_id)?
            .map(|c| c.profile())
    } else {
        None
    };

    Ok(Json(ApiResponse::ok(AuthResponse {
        authenticated,
        citizen,
    })))
}

/// GET /api/auth-log - Authentication log, most recent first
async fn get_auth_log(State(state): State<AppState>) -> ApiResult<Vec<AuthAttempt>> {
    Ok(Json(ApiResponse::ok(state.registry.auth_log()?)))
}

/// GET /api/conflicts - De-duplication conflicts, most recent first
async fn get_conflicts(State(state): State<AppState>) -> ApiResult<Vec<DeduplicationConflict>> {
    Ok(Json(ApiResponse::ok(state.registry.deduplication_conflicts()?)))
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/insights", get(get_insights))
        .route("/citizens", get(list_citizens).post(create_citizen))
        .route(
            "/citizens/:id",
            get(get_citizen).put(update_citizen).delete(delete_citizen),
        )
        .route("/authenticate", post(authenticate))
        .route("/auth-log", get(get_auth_log))
        .route("/conflicts", get(get_conflicts))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let registry = Registry::open_in_memory().unwrap();
        registry.initialize_schema().unwrap();
        build_router(AppState {
            registry,
            failed_auth_alert_threshold: 1,
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn enrollment(id: &str, marker: &str) -> Value {
        json!({
            "aadhaar_id": id,
            "name": "Ravi Kumar",
            "dob": "1988-04-12",
            "gender": "Male",
            "address": "4 Lake View, Chennai",
            "biometric_hash": marker,
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_enroll_read_and_duplicate_marker() {
        let app = test_app();

        let (status, body) = send(&app, Method::POST, "/api/citizens", Some(enrollment("A1", "h1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["aadhaar_id"], "A1");
        assert!(body["data"].get("biometric_hash").is_none());

        let (status, body) = send(&app, Method::POST, "/api/citizens", Some(enrollment("A2", "h1"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, Method::GET, "/api/citizens/A2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, Method::GET, "/api/conflicts", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["biometric_hash"], "h1");
    }

    #[tokio::test]
    async fn test_enrollment_form_constraints() {
        let app = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/citizens",
            Some(enrollment("1234567890123", "h1")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/citizens",
            Some(enrollment("   ", "h1")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut bad_date = enrollment("A1", "h1");
        bad_date["dob"] = json!("12/04/1988");
        let (status, _) = send(&app, Method::POST, "/api/citizens", Some(bad_date)).await;
        assert!(status.is_client_error());

        let (_, body) = send(&app, Method::GET, "/api/citizens", None).await;
        assert!(body["data"]["rows"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_padded_aadhaar_id_is_stored_trimmed() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/citizens",
            Some(enrollment("123456789012   ", "h1")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["aadhaar_id"], "123456789012");

        let (status, _) = send(&app, Method::GET, "/api/citizens/123456789012", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/api/citizens", None).await;
        assert_eq!(body["data"]["rows"][0]["aadhaar_id"], "123456789012");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = test_app();
        send(&app, Method::POST, "/api/citizens", Some(enrollment("A1", "h1"))).await;

        let demographics = json!({
            "name": "Ravi K.",
            "dob": "1988-04-13",
            "gender": "Male",
            "address": "5 Lake View, Chennai",
        });

        let (status, _) = send(&app, Method::PUT, "/api/citizens/A1", Some(demographics.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/api/citizens/A1", None).await;
        assert_eq!(body["data"]["name"], "Ravi K.");
        assert_eq!(body["data"]["dob"], "1988-04-13");

        let (status, _) = send(&app, Method::PUT, "/api/citizens/ZZ", Some(demographics)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::DELETE, "/api/citizens/A1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], true);

        let (_, body) = send(&app, Method::DELETE, "/api/citizens/A1", None).await;
        assert_eq!(body["data"]["deleted"], false);
    }

    #[tokio::test]
    async fn test_authenticate_returns_ekyc_on_success_only() {
        let app = test_app();
        send(&app, Method::POST, "/api/citizens", Some(enrollment("A1", "h1"))).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/authenticate",
            Some(json!({"aadhaar_id": "A1", "biometric_hash": "h1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["authenticated"], true);
        assert_eq!(body["data"]["citizen"]["name"], "Ravi Kumar");
        assert!(body["data"]["citizen"].get("biometric_hash").is_none());

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/authenticate",
            Some(json!({"aadhaar_id": "A1", "biometric_hash": "wrong"})),
        )
        .await;
        assert_eq!(body["data"]["authenticated"], false);
        assert!(body["data"].get("citizen").is_none());

        let (_, body) = send(&app, Method::GET, "/api/auth-log", None).await;
        let log = body["data"].as_array().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0]["status"], "failed");
        assert_eq!(log[1]["status"], "success");
    }

    #[tokio::test]
    async fn test_insights_and_advisories() {
        let app = test_app();
        send(&app, Method::POST, "/api/citizens", Some(enrollment("A1", "h1"))).await;
        send(&app, Method::POST, "/api/citizens", Some(enrollment("A2", "h1"))).await;
        for _ in 0..2 {
            send(
                &app,
                Method::POST,
                "/api/authenticate",
                Some(json!({"aadhaar_id": "A1", "biometric_hash": "nope"})),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/api/insights", None).await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["total_enrolled"], 1);
        assert_eq!(data["failed_auths"], 2);
        assert_eq!(data["dedup_conflicts"], 1);
        assert_eq!(data["advisories"].as_array().unwrap().len(), 2);
        assert_eq!(data["advisories"][0]["level"], "warning");
    }
}
