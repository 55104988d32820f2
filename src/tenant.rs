//! Tenant context - the caller's data partition
//!
//! Built once per request from the authenticated session; immutable and
//! never persisted by this subsystem.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub user_id: i64,

    /// Owning team, when the user works inside one.
    pub team_id: Option<i64>,

    /// Workspace folder the user has selected, if any.
    pub folder_id: Option<String>,
}

impl TenantContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            team_id: None,
            folder_id: None,
        }
    }

    pub fn with_team(mut self, team_id: i64) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Literal rendering of the optional team id for prompt interpolation.
    pub fn team_literal(&self) -> String {
        match self.team_id {
            Some(id) => id.to_string(),
            None => "none".to_string(),
        }
    }

    /// Literal rendering of the optional folder id for prompt interpolation.
    pub fn folder_literal(&self) -> String {
        match &self.folder_id {
            Some(id) => format!("'{}'", id.replace('\'', "''")),
            None => "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_render_absence_marker() {
        let ctx = TenantContext::new(5);
        assert_eq!(ctx.team_literal(), "none");
        assert_eq!(ctx.folder_literal(), "none");
    }

    #[test]
    fn test_folder_literal_escapes_quotes() {
        let ctx = TenantContext::new(5).with_folder("o'brien");
        assert_eq!(ctx.folder_literal(), "'o''brien'");
    }
}
