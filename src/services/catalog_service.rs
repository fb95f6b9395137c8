//! CatalogService — cars and the showrooms that stock them.
//!
//! Deletes rely on `ON DELETE CASCADE`: removing a showroom removes its cars,
//! removing a car removes its reviews.

use crate::{
    models::{
        car::{Car, NewCar},
        showroom::{NewShowroom, Showroom},
    },
    pagination::Window,
    services::{StoreError, StoreResult, not_found},
    validation::ValidationErrors,
};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

const CAR_COLUMNS: &str = "id, car_name, car_decstr, active, car_number, price, showroom_id";
const SHOWROOM_COLUMNS: &str = "id, name, location, website";

#[derive(Clone)]
pub struct CatalogService {
    pub db: Arc<SqlitePool>,
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn count_cars(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cars")
            .fetch_one(&*self.db)
            .await?;
        Ok(count)
    }

    /// One page of cars in id order.
    pub async fn list_cars(&self, window: &Window) -> StoreResult<Vec<Car>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {CAR_COLUMNS} FROM cars"));
        push_window(&mut builder, window);
        let cars = builder.build_query_as::<Car>().fetch_all(&*self.db).await?;
        Ok(cars)
    }

    pub async fn get_car(&self, id: i64) -> StoreResult<Car> {
        sqlx::query_as::<_, Car>(&format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(not_found("Car", id))
    }

    pub async fn create_car(&self, car: &NewCar) -> StoreResult<Car> {
        self.ensure_showroom(car.showroom_id).await?;
        let created = sqlx::query_as::<_, Car>(&format!(
            "INSERT INTO cars (car_name, car_decstr, active, car_number, price, showroom_id)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {CAR_COLUMNS}"
        ))
        .bind(&car.car_name)
        .bind(&car.car_decstr)
        .bind(car.active)
        .bind(&car.car_number)
        .bind(car.price.to_string())
        .bind(car.showroom_id)
        .fetch_one(&*self.db)
        .await?;

        debug!(car = created.id, "created car");
        Ok(created)
    }

    /// Overwrite every writable column of car `id`.
    pub async fn update_car(&self, id: i64, car: &NewCar) -> StoreResult<Car> {
        self.ensure_showroom(car.showroom_id).await?;
        sqlx::query_as::<_, Car>(&format!(
            "UPDATE cars SET car_name = ?, car_decstr = ?, active = ?, car_number = ?,
                    price = ?, showroom_id = ?
             WHERE id = ?
             RETURNING {CAR_COLUMNS}"
        ))
        .bind(&car.car_name)
        .bind(&car.car_decstr)
        .bind(car.active)
        .bind(&car.car_number)
        .bind(car.price.to_string())
        .bind(car.showroom_id)
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found("Car", id))
    }

    pub async fn delete_car(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "Car", id });
        }
        debug!(car = id, "deleted car and its reviews");
        Ok(())
    }

    /// Car ids stocked by each of `showroom_ids`, ascending.
    pub async fn car_ids_by_showroom(&self, showroom_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<i64>>> {
        let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
        if showroom_ids.is_empty() {
            return Ok(grouped);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT showroom_id, id FROM cars WHERE showroom_id IN (");
        let mut ids = builder.separated(", ");
        for id in showroom_ids {
            ids.push_bind(*id);
        }
        builder.push(") ORDER BY id ASC");

        let rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(&*self.db).await?;
        for (showroom_id, car_id) in rows {
            grouped.entry(showroom_id).or_default().push(car_id);
        }
        Ok(grouped)
    }

    pub async fn count_showrooms(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM showrooms")
            .fetch_one(&*self.db)
            .await?;
        Ok(count)
    }

    pub async fn list_showrooms(&self, window: &Window) -> StoreResult<Vec<Showroom>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {SHOWROOM_COLUMNS} FROM showrooms"));
        push_window(&mut builder, window);
        let showrooms = builder
            .build_query_as::<Showroom>()
            .fetch_all(&*self.db)
            .await?;
        Ok(showrooms)
    }

    pub async fn get_showroom(&self, id: i64) -> StoreResult<Showroom> {
        sqlx::query_as::<_, Showroom>(&format!(
            "SELECT {SHOWROOM_COLUMNS} FROM showrooms WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found("Showroom", id))
    }

    pub async fn create_showroom(&self, showroom: &NewShowroom) -> StoreResult<Showroom> {
        let created = sqlx::query_as::<_, Showroom>(&format!(
            "INSERT INTO showrooms (name, location, website) VALUES (?, ?, ?)
             RETURNING {SHOWROOM_COLUMNS}"
        ))
        .bind(&showroom.name)
        .bind(&showroom.location)
        .bind(&showroom.website)
        .fetch_one(&*self.db)
        .await?;

        debug!(showroom = created.id, "created showroom");
        Ok(created)
    }

    pub async fn update_showroom(&self, id: i64, showroom: &NewShowroom) -> StoreResult<Showroom> {
        sqlx::query_as::<_, Showroom>(&format!(
            "UPDATE showrooms SET name = ?, location = ?, website = ? WHERE id = ?
             RETURNING {SHOWROOM_COLUMNS}"
        ))
        .bind(&showroom.name)
        .bind(&showroom.location)
        .bind(&showroom.website)
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found("Showroom", id))
    }

    pub async fn delete_showroom(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM showrooms WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Showroom",
                id,
            });
        }
        debug!(showroom = id, "deleted showroom and its cars");
        Ok(())
    }

    /// A car may only point at an existing showroom.
    async fn ensure_showroom(&self, showroom_id: Option<i64>) -> StoreResult<()> {
        let Some(id) = showroom_id else {
            return Ok(());
        };
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM showrooms WHERE id = ?)")
                .bind(id)
                .fetch_one(&*self.db)
                .await?;
        if exists != 0 {
            Ok(())
        } else {
            Err(StoreError::Invalid(ValidationErrors::single(
                "showroom",
                format!("Invalid pk \"{id}\" - object does not exist."),
            )))
        }
    }
}

/// Append id-ordered paging to a `SELECT ... FROM <table>` builder.
fn push_window(builder: &mut QueryBuilder<'_, Sqlite>, window: &Window) {
    if let Some(after) = &window.after {
        builder.push(" WHERE id > ");
        builder.push_bind(after.id);
    }
    builder.push(" ORDER BY id ASC LIMIT ");
    builder.push_bind(window.limit);
    builder.push(" OFFSET ");
    builder.push_bind(window.offset);
}
