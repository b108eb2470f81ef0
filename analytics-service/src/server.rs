//! JSON API over the repository, the dashboard engines and the narrative
//! service.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use resource_client::db::StoreError;
use resource_client::domain::{
    ClimateSnapshot, Company, GeneratedReport, IndustryType, MeterType, NewReading, Reading,
    ReportType, SettingsUpdate, SubscriptionPlan, User,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::ClimateConfig;
use crate::dashboard::{
    assess_climate, reduction_scenario, summarize, CarbonMetrics, ClimateAssessment,
    DashboardInputs, DashboardSummary, ReductionScenario,
};
use crate::narrative::{
    NarrativeBackend, NarrativeOrigin, NarrativeProfile, NarrativeRequest, NarrativeService,
};
use crate::pipeline::Envelope;
use crate::reports::{compose_report, instant_alert};
use crate::transform::{price_reading, validate_reading};
use crate::SharedRepository;

const DEFAULT_REDUCTION_TARGET_PCT: f64 = 10.0;

#[derive(Clone)]
pub struct AppState {
    pub repo: SharedRepository,
    pub narrative: Arc<NarrativeService<Box<dyn NarrativeBackend>>>,
    pub climate: ClimateConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(e) => {
                tracing::error!(error = %e, "store failure while serving request");
                metrics::counter!("http_store_errors_total").increment(1);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/carbon", get(carbon))
        .route("/api/readings", get(list_readings).post(add_reading))
        .route("/api/company", get(company))
        .route("/api/company/profile", put(update_profile))
        .route("/api/company/plan", put(change_plan))
        .route("/api/climate", get(climate).put(replace_climate))
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/settings", put(update_settings))
        .route("/api/ai/analyze", post(analyze))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid server bind address '{bind_addr}'"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "analytics api listening");
    axum::serve(listener, router(state).into_make_service())
        .await
        .context("analytics api server error")
}

fn count(route: &'static str) {
    metrics::counter!("http_requests_total", "route" => route).increment(1);
}

async fn load_dashboard(state: &AppState) -> Result<(Company, DashboardSummary), ApiError> {
    let repo = state.repo.lock().await;
    let company = repo.company()?;
    let water = repo.readings(Some(MeterType::Water))?;
    let energy = repo.readings(Some(MeterType::Energy))?;
    let climate = repo.climate_data()?;
    drop(repo);

    let summary = summarize(
        &DashboardInputs {
            water: &water,
            energy: &energy,
            climate: &climate,
            sensitivity: company.settings.ai_sensitivity,
            temp_threshold: company.settings.temp_threshold,
        },
        &state.climate,
    );
    Ok((company, summary))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub company: String,
    pub trial_days_left: i64,
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    count("/api/dashboard");
    let (company, summary) = load_dashboard(&state).await?;
    Ok(Json(DashboardView {
        trial_days_left: company.trial_days_left(OffsetDateTime::now_utc()),
        company: company.name,
        summary,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CarbonQuery {
    pub target: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CarbonView {
    pub metrics: CarbonMetrics,
    pub scenario: ReductionScenario,
}

async fn carbon(
    State(state): State<AppState>,
    Query(query): Query<CarbonQuery>,
) -> Result<Json<CarbonView>, ApiError> {
    count("/api/carbon");
    let target = query.target.unwrap_or(DEFAULT_REDUCTION_TARGET_PCT);
    if !(0.0..=100.0).contains(&target) {
        return Err(ApiError::BadRequest(format!(
            "target must be between 0 and 100, got {target}"
        )));
    }

    let (_, summary) = load_dashboard(&state).await?;
    let scenario = reduction_scenario(&summary.carbon, target);
    Ok(Json(CarbonView {
        metrics: summary.carbon,
        scenario,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    #[serde(rename = "type")]
    pub meter_type: Option<MeterType>,
}

async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    count("/api/readings");
    let readings = state.repo.lock().await.readings(query.meter_type)?;
    Ok(Json(readings))
}

#[derive(Debug, Deserialize)]
pub struct AddReadingRequest {
    #[serde(rename = "type")]
    pub meter_type: MeterType,
    pub value: f64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ts: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct AddReadingResponse {
    pub reading: Reading,
    pub report: Option<GeneratedReport>,
}

async fn add_reading(
    State(state): State<AppState>,
    payload: Result<Json<AddReadingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddReadingResponse>), ApiError> {
    count("/api/readings");
    let Json(body) = payload?;
    let now = OffsetDateTime::now_utc();

    let reading = {
        let mut repo = state.repo.lock().await;
        let meter = repo.meter_of_type(body.meter_type)?.ok_or_else(|| {
            ApiError::BadRequest(format!("no {} meter configured", body.meter_type.as_str()))
        })?;
        let tariff = repo.company()?.settings.tariff();

        let captured = NewReading {
            meter_id: meter.id,
            ts: body.ts.unwrap_or(now),
            value: body.value,
            manual: true,
        };
        let env = validate_reading(Envelope::new(captured))
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let reading = price_reading(env.payload, meter.meter_type, &tariff);
        if !repo.add_reading(reading.clone())? {
            return Err(ApiError::Conflict(format!(
                "reading {} is already recorded",
                reading.id
            )));
        }
        reading
    };
    tracing::info!(
        meter_id = %reading.meter_id,
        value = reading.value,
        cost = reading.cost_estimate,
        "reading recorded"
    );

    let report = match instant_alert(body.meter_type) {
        Some((kind, title)) => {
            let (company, summary) = load_dashboard(&state).await?;
            let profile = NarrativeProfile::from_company(&company);
            let new = compose_report(&state.narrative, &profile, kind, title, &summary).await;
            Some(state.repo.lock().await.add_report(new, now)?)
        }
        None => None,
    };

    Ok((StatusCode::CREATED, Json(AddReadingResponse { reading, report })))
}

#[derive(Debug, Serialize)]
pub struct CompanyView {
    pub company: Company,
    pub user: Option<User>,
    pub trial_days_left: i64,
}

async fn company(State(state): State<AppState>) -> Result<Json<CompanyView>, ApiError> {
    count("/api/company");
    let repo = state.repo.lock().await;
    Ok(Json(CompanyView {
        company: repo.company()?,
        user: repo.user()?,
        trial_days_left: repo.trial_days_left(OffsetDateTime::now_utc())?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub industry: IndustryType,
}

async fn update_profile(
    State(state): State<AppState>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Company>, ApiError> {
    count("/api/company/profile");
    let Json(body) = payload?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let company = state
        .repo
        .lock()
        .await
        .update_profile(name.to_string(), body.industry)?;
    Ok(Json(company))
}

#[derive(Debug, Deserialize)]
pub struct PlanChange {
    pub plan: SubscriptionPlan,
}

async fn change_plan(
    State(state): State<AppState>,
    payload: Result<Json<PlanChange>, JsonRejection>,
) -> Result<Json<Company>, ApiError> {
    count("/api/company/plan");
    let Json(body) = payload?;
    if body.plan == SubscriptionPlan::Trial {
        return Err(ApiError::BadRequest("cannot move back to the trial plan".to_string()));
    }

    let company = state.repo.lock().await.set_plan(body.plan)?;
    tracing::info!(company_id = %company.id, plan = ?company.subscription_plan, "plan changed");
    Ok(Json(company))
}

#[derive(Debug, Serialize)]
pub struct ClimateView {
    pub timeline: Vec<ClimateSnapshot>,
    pub assessment: Option<ClimateAssessment>,
}

async fn climate(State(state): State<AppState>) -> Result<Json<ClimateView>, ApiError> {
    count("/api/climate");
    let repo = state.repo.lock().await;
    let threshold = repo.company()?.settings.temp_threshold;
    let timeline = repo.climate_data()?;
    drop(repo);

    let assessment = assess_climate(&timeline, &state.climate, threshold);
    Ok(Json(ClimateView {
        timeline,
        assessment,
    }))
}

/// Replaces the stored timeline, e.g. after a weather provider refresh.
async fn replace_climate(
    State(state): State<AppState>,
    payload: Result<Json<Vec<ClimateSnapshot>>, JsonRejection>,
) -> Result<Json<ClimateView>, ApiError> {
    count("/api/climate");
    let Json(timeline) = payload?;
    let invalid = |s: &&ClimateSnapshot| {
        !s.temp_c.is_finite() || !(0.0..=100.0).contains(&s.humidity) || s.wind_speed < 0.0
    };
    if let Some(bad) = timeline.iter().find(invalid) {
        return Err(ApiError::BadRequest(format!(
            "invalid climate snapshot at {}",
            bad.ts
        )));
    }

    let mut repo = state.repo.lock().await;
    repo.set_climate_data(&timeline)?;
    let threshold = repo.company()?.settings.temp_threshold;
    drop(repo);

    let assessment = assess_climate(&timeline, &state.climate, threshold);
    Ok(Json(ClimateView {
        timeline,
        assessment,
    }))
}

async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<GeneratedReport>>, ApiError> {
    count("/api/reports");
    Ok(Json(state.repo.lock().await.reports()?))
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
}

async fn create_report(
    State(state): State<AppState>,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GeneratedReport>), ApiError> {
    count("/api/reports");
    let Json(body) = payload?;
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let (company, summary) = load_dashboard(&state).await?;
    let profile = NarrativeProfile::from_company(&company);
    let new = compose_report(&state.narrative, &profile, body.report_type, body.title, &summary).await;
    let report = state
        .repo
        .lock()
        .await
        .add_report(new, OffsetDateTime::now_utc())?;

    tracing::info!(report_id = %report.id, risk_score = report.risk_score, "report generated");
    Ok((StatusCode::CREATED, Json(report)))
}

fn validate_settings(update: &SettingsUpdate) -> Result<(), ApiError> {
    let rates = [
        ("water_tariff", update.water_tariff),
        ("carbon_factor_energy", update.carbon_factor_energy),
        ("carbon_factor_water", update.carbon_factor_water),
    ];
    for (name, value) in rates {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(ApiError::BadRequest(format!("{name} must be a non-negative number")));
            }
        }
    }
    if update.temp_threshold.is_some_and(|t| !t.is_finite()) {
        return Err(ApiError::BadRequest("temp_threshold must be a finite number".to_string()));
    }
    if update.weekly_report_day.is_some_and(|d| d > 6) {
        return Err(ApiError::BadRequest("weekly_report_day must be 0-6".to_string()));
    }
    Ok(())
}

async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<Company>, ApiError> {
    count("/api/settings");
    let Json(update) = payload?;
    validate_settings(&update)?;

    let company = state.repo.lock().await.update_settings(&update)?;
    tracing::info!(company_id = %company.id, "settings updated");
    Ok(Json(company))
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: serde_json::Value,
    pub origin: NarrativeOrigin,
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<NarrativeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    count("/api/ai/analyze");
    let Json(request) = payload?;

    let company = state.repo.lock().await.company()?;
    let narrative = state
        .narrative
        .narrate(&request, &NarrativeProfile::from_company(&company))
        .await;

    Ok(Json(AnalyzeResponse {
        result: request.structured_result(&narrative.text),
        origin: narrative.origin,
    }))
}
