use serde::{Deserialize, Serialize};

/// Configuration for the user_management module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserManagementConfig {
    /// Write the sample roster into an empty users table on start-up.
    #[serde(default = "default_seed_sample_users")]
    pub seed_sample_users: bool,
    /// Maximum number of retained activity log events; unbounded when absent.
    #[serde(default)]
    pub activity_log_capacity: Option<usize>,
}

impl Default for UserManagementConfig {
    fn default() -> Self {
        Self {
            seed_sample_users: default_seed_sample_users(),
            activity_log_capacity: None,
        }
    }
}

fn default_seed_sample_users() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: UserManagementConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg, UserManagementConfig::default());
        assert!(cfg.seed_sample_users);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<UserManagementConfig, _> =
            serde_json::from_value(serde_json::json!({ "seed": false }));
        assert!(res.is_err());
    }
}
