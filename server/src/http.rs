use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::NaiveDate;
use platform_api::ApiError;
use platform_authn::{SESSION_COOKIE, decode_token};
use platform_authz::Principal;
use products_hr::{
    report::{self, ReportFilter, ReportSort, SortDirection},
    service::users,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{config::AppConfig, graphql::SchemaType};

const REPORT_FILENAME: &str = "training_report.json";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "hr server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

/// Credentialed CORS never uses a wildcard: with no usable origin every
/// cross-origin request is refused.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(AllowOrigin::list(allowed))
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", get(graphql_handler).post(graphql_handler))
        .route("/graphiql", get(graphiql_handler))
        .route("/reports/training", get(report_handler))
        .route("/logout", post(logout_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    request: GraphQLRequest,
) -> HttpResult<GraphQLResponse> {
    let mut req = request.into_inner();
    if let Some(principal) = resolve_principal(&state, &headers, &jar).await? {
        req = req.data(principal);
    }
    let response = state.schema.execute(req).await;
    Ok(GraphQLResponse::from(response))
}

async fn graphiql_handler() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Query string of the report download. `employee` is a comma-separated id list.
#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    program: Option<Uuid>,
    employee: Option<String>,
    #[serde(default)]
    include_dismissed: bool,
    sort: Option<Uuid>,
    direction: Option<SortDirection>,
    as_of: Option<NaiveDate>,
}

impl ReportQuery {
    fn into_filter(self) -> HttpResult<ReportFilter> {
        let employee_ids = match self.employee.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    Uuid::parse_str(id).map_err(|_| {
                        HttpError::new(StatusCode::BAD_REQUEST, "invalid employee id")
                    })
                })
                .collect::<HttpResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(ReportFilter {
            employee_ids,
            program_id: self.program,
            include_dismissed: self.include_dismissed,
            sort: self.sort.map(|program_id| ReportSort {
                program_id,
                direction: self.direction.unwrap_or_default(),
            }),
            as_of: self.as_of,
        })
    }
}

async fn report_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<ReportQuery>,
) -> HttpResult<Response> {
    let principal = resolve_principal(&state, &headers, &jar)
        .await?
        .ok_or_else(|| HttpError::new(StatusCode::UNAUTHORIZED, "login required"))?;
    let filter = query.into_filter()?;
    let report = report::training_report(state.db.as_ref(), &principal, filter).await?;
    let disposition = format!("attachment; filename=\"{REPORT_FILENAME}\"");
    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(report),
    )
        .into_response())
}

async fn logout_handler(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, StatusCode::NO_CONTENT)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(state.db.as_ref()).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Session token from the `Authorization` header, falling back to the cookie.
/// A bad or expired token yields an anonymous request rather than an error.
async fn resolve_principal(
    state: &AppState,
    headers: &HeaderMap,
    jar: &CookieJar,
) -> HttpResult<Option<Principal>> {
    let token = match bearer_token(headers) {
        Some(token) => token.to_string(),
        None => match jar.get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => return Ok(None),
        },
    };
    let claims = match decode_token(&token, &state.config.auth) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "ignoring session token");
            return Ok(None);
        }
    };
    match users::load_principal(state.db.as_ref(), claims.sub).await {
        Ok(principal) => Ok(Some(principal)),
        Err(ApiError::Unauthenticated) => {
            warn!(user = %claims.username, "session for unknown or disabled account");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::LimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(inner) => {
                warn!(error = %inner, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
