use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub role: Option<String>, // title within the organization, not an access role
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// `None` leaves a column alone; `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub name: Option<String>,
    pub role: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}
