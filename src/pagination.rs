use serde::Deserialize;

use crate::error::AppError;

pub const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_limit() -> i64 {
    100
}

impl Pagination {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.skip < 0 {
            return Err(AppError::Validation("skip must be >= 0".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(Pagination { skip: 0, limit: default_limit() }.validate().is_ok());
        assert!(Pagination { skip: -1, limit: 10 }.validate().is_err());
        assert!(Pagination { skip: 0, limit: 0 }.validate().is_err());
        assert!(Pagination { skip: 0, limit: MAX_LIMIT }.validate().is_ok());
        assert!(Pagination { skip: 0, limit: MAX_LIMIT + 1 }.validate().is_err());
    }
}
