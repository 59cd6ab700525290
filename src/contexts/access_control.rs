use crate::contexts::interception::{Call, Interceptor};
use crate::data::{AuditAction, AuditEntry, LookupError};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

const WILDCARD_GRANTS: [&str; 2] = ["all", "*"];
/// Call attribute naming the user a call was authorized for
const AUTHORIZED_USER: &str = "access_control.user";

/// Access-control proxy hooks: only a logged-in user may look up keys, and
/// only keys covered by one of their grants. Every decision is audited.
///
/// Grant syntax:
/// - `all` or `*` allows every key
/// - `prefix*` allows keys starting with `prefix`
/// - anything else allows exactly that key
pub struct AccessControl {
    grants: HashMap<String, Vec<String>>,
    current_user: RwLock<Option<String>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl AccessControl {
    /// Creates a new AccessControl with no user logged in
    ///
    /// # Arguments
    /// * `grants` - Maps each known user to the key patterns they may look up
    pub fn new(grants: HashMap<String, Vec<String>>) -> Self {
        Self {
            grants,
            current_user: RwLock::new(None),
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Logs `user` in, replacing any current user. Unknown users are refused.
    pub fn login(&self, user: &str) -> bool {
        if !self.grants.contains_key(user) {
            tracing::warn!("[AccessControl] login, unknown user, user={}", user);
            self.record(
                AuditAction::LoginFailed,
                None,
                format!("user {} failed to log in", user),
            );
            return false;
        }

        *self
            .current_user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(user.to_string());
        tracing::info!("[AccessControl] login, user={}", user);
        self.record(
            AuditAction::Login,
            Some(user.to_string()),
            format!("user {} logged in", user),
        );
        true
    }

    pub fn logout(&self) {
        let previous = self
            .current_user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(user) = previous {
            tracing::info!("[AccessControl] logout, user={}", user);
            let details = format!("user {} logged out", user);
            self.record(AuditAction::Logout, Some(user), details);
        }
    }

    pub fn current_user(&self) -> Option<String> {
        self.current_user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether `user` holds a grant covering `key`
    pub fn is_allowed(&self, user: &str, key: &str) -> bool {
        self.grants
            .get(user)
            .is_some_and(|grants| grants.iter().any(|grant| grant_covers(grant, key)))
    }

    /// Copy of the audit trail, oldest first
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, action: AuditAction, user: Option<String>, details: String) {
        self.audit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(AuditEntry::new(action, user, details));
    }
}

fn grant_covers(grant: &str, key: &str) -> bool {
    if WILDCARD_GRANTS.contains(&grant) {
        return true;
    }
    match grant.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => grant == key,
    }
}

impl Interceptor for AccessControl {
    fn before_call(&self, call: &Call<'_>) -> Result<(), LookupError> {
        let Some(user) = self.current_user() else {
            tracing::warn!("[AccessControl] before_call, not logged in, key={}", call.key);
            self.record(
                AuditAction::AccessDenied,
                None,
                format!("anonymous {} of {} refused", call.operation, call.key),
            );
            return Err(LookupError::NotAuthenticated {
                key: call.key.to_string(),
            });
        };

        if !self.is_allowed(&user, call.key) {
            tracing::warn!(
                "[AccessControl] before_call, access denied, user={}, key={}",
                user,
                call.key
            );
            let details = format!("user {} denied {} of {}", user, call.operation, call.key);
            self.record(AuditAction::AccessDenied, Some(user.clone()), details);
            return Err(LookupError::AccessDenied {
                user,
                key: call.key.to_string(),
            });
        }

        call.set_attribute(AUTHORIZED_USER, user);
        Ok(())
    }

    fn after_call(&self, call: &Call<'_>, outcome: &Result<String, LookupError>) {
        // The session may have changed while the call ran; audit the user it was authorized for
        let user = call.attribute(AUTHORIZED_USER);
        let who = user.as_deref().unwrap_or("anonymous").to_string();

        match outcome {
            Ok(_) => self.record(
                AuditAction::CallSucceeded,
                user,
                format!("user {} completed {} of {}", who, call.operation, call.key),
            ),
            // Already audited when the call was refused
            Err(LookupError::NotAuthenticated { .. } | LookupError::AccessDenied { .. }) => {}
            Err(e) => self.record(
                AuditAction::CallFailed,
                user,
                format!("user {} failed {} of {}: {}", who, call.operation, call.key, e),
            ),
        }
    }
}
