use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tower_http::trace::TraceLayer;

use policyd_core::Rule;
use policyd_engine::RuleEngine;

use crate::error::ServerError;
use crate::schemas::DataRequest;

#[must_use]
pub fn router(engine: RuleEngine) -> Router {
    Router::new()
        .route("/v1/rules", get(list_rules).post(add_rule))
        .route(
            "/v1/rules/{application_name}/{name}",
            get(get_rule).delete(delete_rule),
        )
        .route("/v1/rules/{application_name}/{name}/enable", post(enable_rule))
        .route("/v1/rules/{application_name}/{name}/disable", post(disable_rule))
        .route("/v1/rules/{application_name}/{name}/execute", post(execute_rule))
        .route(
            "/v1/applications/{application_name}/data",
            post(submit_application_data),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn list_rules(State(engine): State<RuleEngine>) -> Json<Vec<Rule>> {
    Json(engine.get_rule_list())
}

async fn get_rule(
    State(engine): State<RuleEngine>,
    Path((application_name, name)): Path<(String, String)>,
) -> Result<Json<Rule>, ServerError> {
    Ok(Json(engine.get_rule(&application_name, &name)?))
}

async fn add_rule(
    State(engine): State<RuleEngine>,
    Json(rule): Json<Rule>,
) -> Result<StatusCode, ServerError> {
    engine.add_rule(rule)?;
    Ok(StatusCode::CREATED)
}

async fn delete_rule(
    State(engine): State<RuleEngine>,
    Path((application_name, name)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    engine.delete_rule(&application_name, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn enable_rule(
    State(engine): State<RuleEngine>,
    Path((application_name, name)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    engine.enable_rule(&application_name, &name)?;
    Ok(StatusCode::OK)
}

async fn disable_rule(
    State(engine): State<RuleEngine>,
    Path((application_name, name)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    engine.disable_rule(&application_name, &name)?;
    Ok(StatusCode::OK)
}

async fn execute_rule(
    State(engine): State<RuleEngine>,
    Path((application_name, name)): Path<(String, String)>,
    body: Option<Json<DataRequest>>,
) -> Result<StatusCode, ServerError> {
    let data = match body {
        Some(Json(req)) => BASE64.decode(req.data)?,
        None => Vec::new(),
    };
    engine.execute_rule(&application_name, &name, data).await?;
    Ok(StatusCode::OK)
}

/// `POST /v1/applications/{application_name}/data`.
///
/// The wire payload is base64-decoded twice: `data` is base64 text whose
/// decoded bytes are themselves a base64-encoded XML document. This
/// double-encoding is preserved from the source system rather than
/// collapsed to a single decode.
async fn submit_application_data(
    State(engine): State<RuleEngine>,
    Path(application_name): Path<String>,
    Json(req): Json<DataRequest>,
) -> Result<StatusCode, ServerError> {
    let once = BASE64.decode(req.data)?;
    let twice = BASE64.decode(once)?;
    engine.receive_application_data(&application_name, twice);
    Ok(StatusCode::ACCEPTED)
}
