//! Postgres-backed stores. Needs `DATABASE_URL` pointing at a disposable server.

use sqlx::PgPool;

use reelhouse::application::repos::{EntityStore, RepoError};
use reelhouse::domain::entities::{MovieFields, MovieRecord, UserFields, UserRecord};
use reelhouse::domain::entity::EntityId;
use reelhouse::infra::db::PostgresRepositories;

fn heat() -> MovieFields {
    MovieFields {
        title: "Heat".to_string(),
        genre: "Crime".to_string(),
        year: 1995,
    }
}

fn ada(membership: &str) -> UserFields {
    UserFields {
        email: "ada@example.com".to_string(),
        membership_type: membership.to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn movie_store_roundtrip(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let created = EntityStore::<MovieRecord>::create(&repos, &heat())
        .await
        .expect("create movie");
    assert_eq!(created.title, "Heat");

    let found = EntityStore::<MovieRecord>::find_by_id(&repos, created.id)
        .await
        .expect("find movie");
    assert_eq!(found, Some(created.clone()));

    let mut fields = heat();
    fields.year = 1996;
    let updated = EntityStore::<MovieRecord>::update(&repos, created.id, &fields)
        .await
        .expect("update movie");
    assert_eq!(updated.year, 1996);

    let listed = EntityStore::<MovieRecord>::list(&repos)
        .await
        .expect("list movies");
    assert_eq!(listed, vec![updated]);

    EntityStore::<MovieRecord>::delete(&repos, created.id)
        .await
        .expect("delete movie");
    let gone = EntityStore::<MovieRecord>::find_by_id(&repos, created.id)
        .await
        .expect("find deleted movie");
    assert!(gone.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn absent_rows_are_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let id = EntityId::new(9_999);

    let updated = EntityStore::<MovieRecord>::update(&repos, id, &heat()).await;
    assert!(matches!(updated, Err(RepoError::NotFound)));

    let deleted = EntityStore::<UserRecord>::delete(&repos, id).await;
    assert!(matches!(deleted, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_is_rejected(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    EntityStore::<UserRecord>::create(&repos, &ada("basic"))
        .await
        .expect("first registration");
    let second = EntityStore::<UserRecord>::create(&repos, &ada("premium")).await;

    match second {
        Err(RepoError::Duplicate { constraint }) => assert_eq!(constraint, "users_email_key"),
        other => panic!("expected duplicate error, got {other:?}"),
    }
}
