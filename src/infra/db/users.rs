use async_trait::async_trait;

use crate::{
    application::repos::{EntityStore, RepoError},
    domain::entities::{UserFields, UserRecord},
    domain::entity::EntityId,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    membership_type: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: EntityId::new(row.id),
            email: row.email,
            membership_type: row.membership_type,
        }
    }
}

#[async_trait]
impl EntityStore<UserRecord> for PostgresRepositories {
    async fn create(&self, fields: &UserFields) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, membership_type)
            VALUES ($1, $2)
            RETURNING id, email, membership_type
            "#,
        )
        .bind(&fields.email)
        .bind(&fields.membership_type)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, membership_type FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn update(&self, id: EntityId, fields: &UserFields) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET email = $2, membership_type = $3
            WHERE id = $1
            RETURNING id, email, membership_type
            "#,
        )
        .bind(id.get())
        .bind(&fields.email)
        .bind(&fields.membership_type)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(UserRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: EntityId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserRecord>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, membership_type FROM users ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }
}
