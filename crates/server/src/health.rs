use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use vendorhub_db::{migrations, DbPool};
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";
    if !ready {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            detail = %database.detail,
            "health check reported degraded database"
        );
    }

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "vendorhub-server runtime initialized".to_string(),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Ready only when the database answers and the procurement tables exist.
async fn database_check(pool: &DbPool) -> HealthCheck {
    match migrations::missing_tables(pool).await {
        Ok(missing) if missing.is_empty() => {
            HealthCheck { status: "ready", detail: "procurement schema available".to_string() }
        }
        Ok(missing) => HealthCheck {
            status: "degraded",
            detail: format!("missing tables: {}", missing.join(", ")),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
