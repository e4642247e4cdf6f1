use crate::api::evaluation::{
    CalculateQuery, CalculationResponse, PeriodQuery, PurgeResponse, UpsertEvaluation,
};
use crate::engine::scorer::AttendanceDetail;
use crate::model::evaluation::EvaluationStatus;
use crate::model::user::UserSummary;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Internship Evaluation API",
        version = "1.0.0",
        description = r#"
## Monthly Intern Performance Evaluation

Scores interns once per calendar month and ranks them.

### Scoring
- **absen** (0-35) is computed from attendance over the month's working days
  (weekends and holidays excluded): `Hadir` = 35, `Telat` = 30, anything else 0.
- **kuantitas** and **kualitas** (0-30 each) are entered by an admin.
- **laporan** adds a flat 5 points when the monthly report was submitted.
- **hasil** = absen + kuantitas + kualitas + laporan bonus, at most 100.

`absen` and `hasil` are never stored; every read recomputes them from current attendance.

### Lifecycle
Evaluations start as `Draft`. A `Final` evaluation can no longer be edited or deleted
until it is reset to `Draft`.

### Security
All endpoints require a **JWT Bearer** access token with the Admin role.

### Response Format
Every response is `{ "success": bool, "message"?: string, "data"?: ... }`.
"#,
    ),
    paths(
        crate::api::evaluation::calculate,
        crate::api::evaluation::upsert_evaluation,
        crate::api::evaluation::list_evaluations,
        crate::api::evaluation::ranking,
        crate::api::evaluation::reset_to_draft,
        crate::api::evaluation::delete_evaluation,
        crate::api::evaluation::purge_finals
    ),
    components(
        schemas(
            CalculateQuery,
            PeriodQuery,
            UpsertEvaluation,
            CalculationResponse,
            AttendanceDetail,
            PurgeResponse,
            UserSummary,
            EvaluationStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Evaluation", description = "Monthly intern evaluation APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_evaluation_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/evaluations",
            "/api/evaluations/calculate",
            "/api/evaluations/ranking",
            "/api/evaluations/{id}",
            "/api/evaluations/{id}/reset",
            "/api/evaluations/final/{bulan}/{tahun}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
