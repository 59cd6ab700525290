use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event recorded by the access-control proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    AccessDenied,
    CallSucceeded,
    CallFailed,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::AccessDenied => "ACCESS_DENIED",
            AuditAction::CallSucceeded => "CALL_SUCCEEDED",
            AuditAction::CallFailed => "CALL_FAILED",
        };
        write!(f, "{}", name)
    }
}

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// User that was logged in when the event happened (if any)
    pub user: Option<String>,
    pub details: String,
}

impl AuditEntry {
    pub fn new(action: AuditAction, user: Option<String>, details: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            user,
            details: details.into(),
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.action,
            self.details
        )
    }
}
