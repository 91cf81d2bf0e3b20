use serde::Deserialize;

use crate::pagination::Pagination;

use super::repo_types::{MemberChanges, MemberFilter, NewMember};

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::pagination::default_limit")]
    pub limit: i64,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl MemberQuery {
    pub fn into_filter(self) -> Result<MemberFilter, crate::error::AppError> {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
        .validate()?;
        Ok(MemberFilter {
            search: self.search,
            is_active: self.is_active,
            skip: self.skip,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

impl From<CreateMemberRequest> for NewMember {
    fn from(r: CreateMemberRequest) -> Self {
        Self {
            name: r.name.trim().to_string(),
            role: r.role,
            bio: r.bio,
            image_url: r.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateMemberRequest> for MemberChanges {
    fn from(r: UpdateMemberRequest) -> Self {
        Self {
            name: r.name.map(|n| n.trim().to_string()),
            role: r.role,
            bio: r.bio,
            image_url: r.image_url,
            is_active: r.is_active,
        }
    }
}
