use axum::extract::Json;

use super::common::success_response;
use crate::{
    auth::AuthUser,
    services::costing::{compute_yarn_cost, YarnCostBreakdown, YarnCostInput},
    ApiResult,
};

/// Per-kg yarn cost build-up with optional batch totals
#[utoipa::path(
    post,
    path = "/api/v1/costing/yarn",
    request_body = YarnCostInput,
    responses(
        (status = 200, description = "Cost breakdown", body = YarnCostBreakdown),
        (status = 400, description = "Negative input or yield/margin out of range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "costing"
)]
pub async fn yarn_cost(
    _user: AuthUser,
    Json(payload): Json<YarnCostInput>,
) -> ApiResult<YarnCostBreakdown> {
    Ok(success_response(compute_yarn_cost(&payload)?))
}
