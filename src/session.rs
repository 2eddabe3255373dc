use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// Fixed demo credential pairs. Not secrets; the sole gate to reach the core.
const DEMO_ACCOUNTS: &[(&str, &str, Role)] = &[
    ("admin", "admin123", Role::Admin),
    ("student", "student123", Role::Student),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// Acting identity, passed explicitly to every core operation. There is no
/// ambient current-user state anywhere in the crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn require_admin(&self) -> Result<(), CoreError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(CoreError::Forbidden("admin role required".to_string()))
        }
    }

    pub fn require_student(&self) -> Result<(), CoreError> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(CoreError::Forbidden("student role required".to_string()))
        }
    }
}

/// Exact-match check against the demo accounts for the requested role.
pub fn login(username: &str, password: &str, role: Role) -> Result<Session, CoreError> {
    for (user, pass, acct_role) in DEMO_ACCOUNTS {
        if *acct_role == role && *user == username && *pass == password {
            return Ok(Session {
                username: username.to_string(),
                role,
            });
        }
    }
    Err(CoreError::Unauthorized)
}
