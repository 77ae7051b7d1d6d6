use async_trait::async_trait;

use crate::{
    application::repos::{EntityStore, RepoError},
    domain::entities::{MovieFields, MovieRecord},
    domain::entity::EntityId,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: i64,
    title: String,
    genre: String,
    year: i32,
}

impl From<MovieRow> for MovieRecord {
    fn from(row: MovieRow) -> Self {
        Self {
            id: EntityId::new(row.id),
            title: row.title,
            genre: row.genre,
            year: row.year,
        }
    }
}

#[async_trait]
impl EntityStore<MovieRecord> for PostgresRepositories {
    async fn create(&self, fields: &MovieFields) -> Result<MovieRecord, RepoError> {
        let row = sqlx::query_as::<_, MovieRow>(
            r#"
            INSERT INTO movies (title, genre, year)
            VALUES ($1, $2, $3)
            RETURNING id, title, genre, year
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.genre)
        .bind(fields.year)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<MovieRecord>, RepoError> {
        let row = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, genre, year FROM movies WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MovieRecord::from))
    }

    async fn update(&self, id: EntityId, fields: &MovieFields) -> Result<MovieRecord, RepoError> {
        let row = sqlx::query_as::<_, MovieRow>(
            r#"
            UPDATE movies
            SET title = $2, genre = $3, year = $4
            WHERE id = $1
            RETURNING id, title, genre, year
            "#,
        )
        .bind(id.get())
        .bind(&fields.title)
        .bind(&fields.genre)
        .bind(fields.year)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(MovieRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: EntityId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MovieRecord>, RepoError> {
        let rows = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, genre, year FROM movies ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MovieRecord::from).collect())
    }
}
