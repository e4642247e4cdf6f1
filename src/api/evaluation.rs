use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::response::ApiResponse;
use crate::auth::auth::AuthUser;
use crate::engine::EvaluationEngine;
use crate::engine::scorer::{AttendanceDetail, AttendanceScore};
use crate::error::{EvaluationError, Result};
use crate::model::evaluation::{EvaluationKey, EvaluationStatus, ScoreInput};
use crate::model::period::Period;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CalculateQuery {
    /// Intern whose attendance is scored
    #[schema(example = 12)]
    pub user_id: Option<u64>,
    #[schema(example = 2)]
    pub bulan: Option<u32>,
    #[schema(example = 2025)]
    pub tahun: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    #[schema(example = 2)]
    pub bulan: Option<u32>,
    #[schema(example = 2025)]
    pub tahun: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertEvaluation {
    #[schema(example = 12)]
    pub user_id: Option<u64>,
    #[schema(example = 2)]
    pub bulan: Option<u32>,
    #[schema(example = 2025)]
    pub tahun: Option<i32>,
    #[schema(example = 25.0, minimum = 0.0, maximum = 30.0)]
    pub kuantitas: Option<f64>,
    #[schema(example = 27.5, minimum = 0.0, maximum = 30.0)]
    pub kualitas: Option<f64>,
    #[schema(example = true)]
    pub laporan: Option<bool>,
    /// `Draft` (default) or `Final`
    #[schema(example = "Draft")]
    pub status: Option<String>,
}

impl UpsertEvaluation {
    fn into_parts(self) -> Result<(EvaluationKey, ScoreInput)> {
        let user_id = required(self.user_id, "userId")?;
        let period = Period::new(required(self.bulan, "bulan")?, required(self.tahun, "tahun")?)?;
        let status = self
            .status
            .map(|raw| {
                raw.parse::<EvaluationStatus>().map_err(|_| {
                    EvaluationError::Validation(format!(
                        "status must be Draft or Final, got '{raw}'"
                    ))
                })
            })
            .transpose()?;

        Ok((
            EvaluationKey { user_id, period },
            ScoreInput {
                kuantitas: self.kuantitas,
                kualitas: self.kualitas,
                laporan: self.laporan,
                status,
            },
        ))
    }
}

/// Body of the calculate endpoint. `kuantitas` is always 0: it prefills the
/// manual entry form.
#[derive(Debug, Serialize, ToSchema)]
pub struct CalculationResponse {
    #[schema(example = 32.5)]
    pub absen: f64,
    #[schema(example = 0)]
    pub kuantitas: u8,
    pub detail: AttendanceDetail,
}

impl From<AttendanceScore> for CalculationResponse {
    fn from(score: AttendanceScore) -> Self {
        Self {
            absen: score.absen,
            kuantitas: 0,
            detail: score.detail,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    #[schema(example = 4)]
    pub deleted_count: u64,
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| EvaluationError::Validation(format!("{name} is required")))
}

fn period_from(bulan: Option<u32>, tahun: Option<i32>) -> Result<Period> {
    Period::new(required(bulan, "bulan")?, required(tahun, "tahun")?)
}

/// Attendance score preview for one intern and month
#[utoipa::path(
    get,
    path = "/api/evaluations/calculate",
    params(CalculateQuery),
    responses(
        (status = 200, description = "Attendance score computed", body = Object, example = json!({
            "success": true,
            "data": {
                "absen": 32.5,
                "kuantitas": 0,
                "detail": {"totalWorkingDays": 20, "attendedDays": 20, "totalPoints": 650, "avgPoints": 32.5}
            }
        })),
        (status = 400, description = "Missing or invalid parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn calculate(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    query: web::Query<CalculateQuery>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let query = query.into_inner();
    let user_id = required(query.user_id, "userId")?;
    let period = period_from(query.bulan, query.tahun)?;

    let score = engine.calculate(user_id, period).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CalculationResponse::from(score))))
}

/// Create or replace the manual scores of an evaluation
#[utoipa::path(
    post,
    path = "/api/evaluations",
    request_body = UpsertEvaluation,
    responses(
        (status = 200, description = "Evaluation saved", body = Object, example = json!({
            "success": true,
            "message": "Evaluation saved",
            "data": {
                "id": 3,
                "user": {"kind": "resolved", "id": 12, "name": "Siti Rahma", "email": "siti@kampus.ac.id", "instansi": "Universitas Indonesia"},
                "bulan": 2, "tahun": 2025,
                "kuantitas": 25.0, "kualitas": 27.5, "laporan": true, "status": "Draft",
                "createdAt": "2025-03-01T09:00:00Z", "updatedAt": "2025-03-01T09:00:00Z",
                "absen": 32.5, "hasil": 90.0
            }
        })),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Evaluation is Final")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn upsert_evaluation(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    payload: web::Json<UpsertEvaluation>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let (key, input) = payload.into_inner().into_parts()?;
    let scored = engine.upsert(key, input).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("Evaluation saved", scored)))
}

/// All evaluations of a month, highest `hasil` first
#[utoipa::path(
    get,
    path = "/api/evaluations",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Evaluations with computed absen and hasil", body = Object),
        (status = 400, description = "Missing or invalid parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn list_evaluations(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let period = period_from(query.bulan, query.tahun)?;
    let evaluations = engine.list(period).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(evaluations)))
}

/// Final evaluations of a month, highest `hasil` first
#[utoipa::path(
    get,
    path = "/api/evaluations/ranking",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Ranking of Final evaluations", body = Object),
        (status = 400, description = "Missing or invalid parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn ranking(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let period = period_from(query.bulan, query.tahun)?;
    let ranked = engine.ranking(period).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ranked)))
}

/// Move a Final evaluation back to Draft
#[utoipa::path(
    put,
    path = "/api/evaluations/{id}/reset",
    params(
        ("id" = u64, Path, description = "Evaluation ID")
    ),
    responses(
        (status = 200, description = "Evaluation reset", body = Object, example = json!({
            "success": true,
            "message": "Evaluation reset to Draft"
        })),
        (status = 404, description = "Evaluation not found"),
        (status = 409, description = "Evaluation is not Final")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn reset_to_draft(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let evaluation = engine.reset_to_draft(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        "Evaluation reset to Draft",
        evaluation,
    )))
}

/// Delete a Draft evaluation
#[utoipa::path(
    delete,
    path = "/api/evaluations/{id}",
    params(
        ("id" = u64, Path, description = "Evaluation ID")
    ),
    responses(
        (status = 200, description = "Evaluation deleted", body = Object, example = json!({
            "success": true,
            "message": "Evaluation deleted"
        })),
        (status = 404, description = "Evaluation not found"),
        (status = 409, description = "Evaluation is Final")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn delete_evaluation(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    engine.delete_draft(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Evaluation deleted")))
}

/// Delete every Final evaluation of a month
#[utoipa::path(
    delete,
    path = "/api/evaluations/final/{bulan}/{tahun}",
    params(
        ("bulan" = u32, Path, description = "Month, 1-12"),
        ("tahun" = i32, Path, description = "Year")
    ),
    responses(
        (status = 200, description = "Final evaluations purged", body = PurgeResponse),
        (status = 400, description = "Invalid month")
    ),
    security(("bearer_auth" = [])),
    tag = "Evaluation"
)]
pub async fn purge_finals(
    auth: AuthUser,
    engine: web::Data<EvaluationEngine>,
    path: web::Path<(u32, i32)>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let (bulan, tahun) = path.into_inner();
    let deleted_count = engine.purge_finals(Period::new(bulan, tahun)?).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        format!("{deleted_count} Final evaluations deleted"),
        PurgeResponse { deleted_count },
    )))
}
