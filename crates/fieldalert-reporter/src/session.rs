//! Explicit session context.
//!
//! A [`SessionContext`] is created at login and passed by reference to every
//! component that needs the reporter's identity. [`SessionManager`] ties its
//! lifetime to login/logout.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

/// Role of the logged-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reporter,
    Responder,
    Investigator,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reporter => "reporter",
            Self::Responder => "responder",
            Self::Investigator => "investigator",
        }
    }
}

/// Identity of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_id: String,
    display_name: String,
    phone: Option<String>,
    role: Role,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            phone: None,
            role,
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub const fn role(&self) -> Role {
        self.role
    }
}

/// Owns the current session between login and logout.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: RwLock<Option<Arc<SessionContext>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session, replacing any previous one.
    pub async fn login(&self, context: SessionContext) -> Arc<SessionContext> {
        let context = Arc::new(context);
        info!(user_id = %context.user_id, role = context.role.as_str(), "Session started");
        *self.current.write().await = Some(Arc::clone(&context));
        context
    }

    /// Tear down the current session. Returns whether one was active.
    pub async fn logout(&self) -> bool {
        let previous = self.current.write().await.take();
        if let Some(ctx) = &previous {
            info!(user_id = %ctx.user_id, "Session ended");
        }
        previous.is_some()
    }

    pub async fn current(&self) -> Option<Arc<SessionContext>> {
        self.current.read().await.clone()
    }
}
