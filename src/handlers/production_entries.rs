use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::production_entry::Shift,
    errors::ServiceError,
    services::production_entries::{
        CreateProductionEntry, DailyProduction, ProductionEntryFilter, ProductionEntryView,
        ProductionSummary, UpdateProductionEntry,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Filters shared by the flat, daily and summary views
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductionEntryQuery {
    pub unit: Option<i32>,
    #[serde(rename = "machineNumber", alias = "machine_number")]
    pub machine_number: Option<i32>,
    pub shift: Option<Shift>,
    #[serde(rename = "dateFrom", alias = "date_from")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "dateTo", alias = "date_to")]
    pub date_to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ProductionEntryQuery {
    fn filter(&self, user: &AuthUser) -> Result<ProductionEntryFilter, ServiceError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "dateFrom must not be after dateTo".to_string(),
                ));
            }
        }
        Ok(ProductionEntryFilter {
            unit: user.scoped_unit(self.unit)?,
            machine_number: self.machine_number,
            shift: self.shift,
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/asu/production-entries",
    params(ProductionEntryQuery),
    responses(
        (status = 200, description = "Entries by date desc, machine, shift", body = [ProductionEntryView]),
        (status = 403, description = "Unit outside the caller's scope", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductionEntryQuery>,
) -> ApiResult<PaginatedResponse<ProductionEntryView>> {
    let filter = query.filter(&user)?;
    let page = page_request(query.page, query.limit, &state.config);
    let entries = state.services.production_entries.list(&filter, page).await?;
    Ok(success_response(paginated(entries, page)))
}

/// Day and night shifts reconciled per machine and date
#[utoipa::path(
    get,
    path = "/api/v1/asu/production-entries/daily",
    params(ProductionEntryQuery),
    responses(
        (status = 200, description = "Grouped rows", body = [DailyProduction])
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn daily_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductionEntryQuery>,
) -> ApiResult<PaginatedResponse<DailyProduction>> {
    let filter = query.filter(&user)?;
    let page = page_request(query.page, query.limit, &state.config);
    let rows = state.services.production_entries.daily(&filter, page).await?;
    Ok(success_response(paginated(rows, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/asu/production-entries/summary",
    params(ProductionEntryQuery),
    responses(
        (status = 200, description = "Totals by date and by machine", body = ProductionSummary)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn entries_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductionEntryQuery>,
) -> ApiResult<ProductionSummary> {
    let filter = query.filter(&user)?;
    let summary = state.services.production_entries.summary(&filter).await?;
    Ok(success_response(summary))
}

async fn entry_in_scope(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> Result<ProductionEntryView, ServiceError> {
    let entry = state.services.production_entries.get(id).await?;
    user.ensure_unit_access(entry.entry.unit)?;
    Ok(entry)
}

#[utoipa::path(
    get,
    path = "/api/v1/asu/production-entries/{id}",
    params(("id" = i32, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry", body = ProductionEntryView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn get_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<ProductionEntryView> {
    Ok(success_response(entry_in_scope(&state, &user, id).await?))
}

/// Record day and/or night shift output for one machine and date
#[utoipa::path(
    post,
    path = "/api/v1/asu/production-entries",
    request_body = CreateProductionEntry,
    responses(
        (status = 201, description = "Created shift rows", body = [ProductionEntryView]),
        (status = 400, description = "No shift given, negative value or inactive machine", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown machine number", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shift already recorded", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductionEntry>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductionEntryView>>>), ServiceError> {
    user.ensure_unit_access(payload.unit)?;
    let created = state
        .services
        .production_entries
        .create(payload, Some(user.user_id))
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/v1/asu/production-entries/{id}",
    params(("id" = i32, Path, description = "Entry id")),
    request_body = UpdateProductionEntry,
    responses(
        (status = 200, description = "Entry updated", body = ProductionEntryView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductionEntry>,
) -> ApiResult<ProductionEntryView> {
    entry_in_scope(&state, &user, id).await?;
    let entry = state.services.production_entries.update(id, payload).await?;
    Ok(success_response(entry))
}

#[utoipa::path(
    delete,
    path = "/api/v1/asu/production-entries/{id}",
    params(("id" = i32, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    entry_in_scope(&state, &user, id).await?;
    state.services.production_entries.delete(id).await?;
    Ok(message_response("Production entry deleted"))
}
