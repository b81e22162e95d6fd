use crate::{
    error::{AppError, AppResult},
    models::{location, Location, LocationModel},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

/// Read-side access to directory entries. Writes happen elsewhere; the
/// voting API only needs targets to resolve.
pub struct LocationService {
    db: DatabaseConnection,
}

#[derive(Debug, Default, Clone)]
pub struct LocationFilter {
    pub city: Option<String>,
    pub category: Option<String>,
}

impl LocationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: LocationFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<LocationModel>, u64)> {
        let mut query = Location::find().filter(location::Column::DeletedAt.is_null());

        if let Some(city) = filter.city {
            query = query.filter(location::Column::City.eq(city));
        }
        if let Some(category) = filter.category {
            query = query.filter(location::Column::Category.eq(category));
        }

        let paginator = query
            .order_by_asc(location::Column::Name)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let locations = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((locations, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<LocationModel> {
        Location::find_by_id(id)
            .filter(location::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}
