use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HeroSlide {
    pub id: Uuid,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub display_order: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Shared by create and update. On update `None` leaves a column alone and
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct SlideFields {
    pub title: Option<Option<String>>,
    pub subtitle: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub display_order: Option<Option<i32>>,
}

const SLIDE_COLUMNS: &str =
    "id, title, subtitle, image_url, is_active, display_order, created_at, updated_at";

pub async fn list(
    db: &PgPool,
    is_active: Option<bool>,
    skip: i64,
    limit: i64,
) -> anyhow::Result<Vec<HeroSlide>> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {SLIDE_COLUMNS} FROM hero_slides WHERE TRUE"));
    if let Some(active) = is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" ORDER BY display_order ASC NULLS LAST, created_at ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);

    qb.build_query_as::<HeroSlide>()
        .fetch_all(db)
        .await
        .context("list hero slides")
}

pub async fn create(db: &PgPool, f: SlideFields) -> anyhow::Result<HeroSlide> {
    sqlx::query_as::<_, HeroSlide>(&format!(
        r#"
        INSERT INTO hero_slides (id, title, subtitle, image_url, is_active, display_order)
        VALUES ($1, $2, $3, $4, COALESCE($5, TRUE), $6)
        RETURNING {SLIDE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(f.title.flatten())
    .bind(f.subtitle.flatten())
    .bind(f.image_url.flatten())
    .bind(f.is_active)
    .bind(f.display_order.flatten())
    .fetch_one(db)
    .await
    .context("insert hero slide")
}

pub async fn update(db: &PgPool, id: Uuid, f: SlideFields) -> anyhow::Result<Option<HeroSlide>> {
    sqlx::query_as::<_, HeroSlide>(&format!(
        r#"
        UPDATE hero_slides
           SET title         = CASE WHEN $2 THEN $3 ELSE title END,
               subtitle      = CASE WHEN $4 THEN $5 ELSE subtitle END,
               image_url     = CASE WHEN $6 THEN $7 ELSE image_url END,
               is_active     = COALESCE($8, is_active),
               display_order = CASE WHEN $9 THEN $10 ELSE display_order END,
               updated_at    = now()
         WHERE id = $1
        RETURNING {SLIDE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(f.title.is_some())
    .bind(f.title.flatten())
    .bind(f.subtitle.is_some())
    .bind(f.subtitle.flatten())
    .bind(f.image_url.is_some())
    .bind(f.image_url.flatten())
    .bind(f.is_active)
    .bind(f.display_order.is_some())
    .bind(f.display_order.flatten())
    .fetch_optional(db)
    .await
    .context("update hero slide")
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM hero_slides WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete hero slide")?;
    Ok(res.rows_affected() > 0)
}
