use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{Member, MemberChanges, MemberFilter, NewMember};

const MEMBER_COLUMNS: &str = "id, name, role, bio, image_url, is_active, created_at, updated_at";

/// Wraps `term` for ILIKE, escaping the pattern metacharacters it contains.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub async fn list(db: &PgPool, filter: &MemberFilter) -> anyhow::Result<Vec<Member>> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {MEMBER_COLUMNS} FROM members WHERE TRUE"));

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR role ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR bio ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" ORDER BY created_at ASC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.skip);

    let rows = qb
        .build_query_as::<Member>()
        .fetch_all(db)
        .await
        .context("list members")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Member>> {
    let row = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get member")?;
    Ok(row)
}

pub async fn create(db: &PgPool, new: NewMember) -> anyhow::Result<Member> {
    let row = sqlx::query_as::<_, Member>(&format!(
        r#"
        INSERT INTO members (id, name, role, bio, image_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(new.name)
    .bind(new.role)
    .bind(new.bio)
    .bind(new.image_url)
    .fetch_one(db)
    .await
    .context("insert member")?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, changes: MemberChanges) -> anyhow::Result<Option<Member>> {
    let row = sqlx::query_as::<_, Member>(&format!(
        r#"
        UPDATE members
           SET name       = COALESCE($2, name),
               role       = CASE WHEN $3 THEN $4 ELSE role END,
               bio        = CASE WHEN $5 THEN $6 ELSE bio END,
               image_url  = CASE WHEN $7 THEN $8 ELSE image_url END,
               is_active  = COALESCE($9, is_active),
               updated_at = now()
         WHERE id = $1
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.name)
    .bind(changes.role.is_some())
    .bind(changes.role.flatten())
    .bind(changes.bio.is_some())
    .bind(changes.bio.flatten())
    .bind(changes.image_url.is_some())
    .bind(changes.image_url.flatten())
    .bind(changes.is_active)
    .fetch_optional(db)
    .await
    .context("update member")?;
    Ok(row)
}

/// Soft delete. Returns false when the member does not exist.
pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let done = update(
        db,
        id,
        MemberChanges {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;
    Ok(done.is_some())
}
