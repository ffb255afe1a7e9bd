use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateMenuItemParams, MenuRepo, MenuWriteRepo, RepoError, UpdateMenuItemParams,
};
use crate::domain::entities::MenuItemRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    label: String,
    destination: String,
    sort_order: i32,
    visible: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<MenuItemRow> for MenuItemRecord {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            destination: row.destination,
            sort_order: row.sort_order,
            visible: row.visible,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl MenuRepo for PostgresRepositories {
    async fn list_items(&self, visible_only: bool) -> Result<Vec<MenuItemRecord>, RepoError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, label, destination, sort_order, visible, created_at, updated_at
            FROM menu_items
            WHERE visible OR NOT $1
            ORDER BY sort_order ASC, label ASC
            "#,
        )
        .bind(visible_only)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MenuItemRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, label, destination, sort_order, visible, created_at, updated_at
            FROM menu_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MenuItemRecord::from))
    }
}

#[async_trait]
impl MenuWriteRepo for PostgresRepositories {
    async fn create_item(
        &self,
        params: CreateMenuItemParams,
    ) -> Result<MenuItemRecord, RepoError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            INSERT INTO menu_items (id, label, destination, sort_order, visible)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, label, destination, sort_order, visible, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.label)
        .bind(params.destination)
        .bind(params.sort_order)
        .bind(params.visible)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(MenuItemRecord::from(row))
    }

    async fn update_item(
        &self,
        params: UpdateMenuItemParams,
    ) -> Result<MenuItemRecord, RepoError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            UPDATE menu_items
            SET label = $2, destination = $3, sort_order = $4, visible = $5, updated_at = now()
            WHERE id = $1
            RETURNING id, label, destination, sort_order, visible, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(params.label)
        .bind(params.destination)
        .bind(params.sort_order)
        .bind(params.visible)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(MenuItemRecord::from(row))
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
