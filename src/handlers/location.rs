use crate::error::{AppError, AppResult};
use crate::models::LocationModel;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::location::{LocationFilter, LocationService};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub city: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LocationModel> for LocationResponse {
    fn from(l: LocationModel) -> Self {
        Self {
            id: l.id,
            name: l.name,
            city: l.city,
            category: l.category,
            description: l.description,
            created_at: l.created_at.to_string(),
            updated_at: l.updated_at.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<u64>, Query, description = "Items per page, max 100"),
        ("city" = Option<String>, Query, description = "Filter by city"),
        ("category" = Option<String>, Query, description = "Filter by category"),
    ),
    responses(
        (status = 200, description = "Paginated locations", body = PaginatedResponse<LocationResponse>),
        (status = 400, description = "Invalid pagination", body = AppError),
    ),
    tag = "locations"
)]
pub async fn list_locations(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<LocationListQuery>,
) -> AppResult<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20);
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(AppError::Validation(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }

    let filter = LocationFilter {
        city: query.city,
        category: query.category,
    };

    let service = LocationService::new(db);
    let (locations, total) = service.list(filter, page, per_page).await?;

    let items: Vec<LocationResponse> = locations.into_iter().map(LocationResponse::from).collect();
    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location details", body = LocationResponse),
        (status = 404, description = "Location not found", body = AppError),
    ),
    tag = "locations"
)]
pub async fn get_location(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = LocationService::new(db);
    let location = service.get_by_id(id).await?;
    Ok(ApiResponse::ok(LocationResponse::from(location)))
}
