use log::info;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Signed-in user, fixed for the lifetime of a sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub display_name: String,
    pub id_token: String,
}

/// Holds the current session for the component tree it is handed to.
///
/// Screens receive a snapshot (`Arc<UserSession>`); a sign-out does not mutate
/// snapshots already handed out.
#[derive(Clone, Default)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Arc<UserSession>>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, session: UserSession) -> Arc<UserSession> {
        let session = Arc::new(session);
        let mut current = self.current.write().await;
        if let Some(previous) = current.replace(Arc::clone(&session)) {
            info!("Replacing session of {}", previous.display_name);
        }
        info!("Signed in as {}", session.display_name);
        session
    }

    pub async fn sign_out(&self) {
        if let Some(session) = self.current.write().await.take() {
            info!("Signed out {}", session.display_name);
        }
    }

    pub async fn current(&self) -> Option<Arc<UserSession>> {
        self.current.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserSession {
        UserSession {
            user_id: "u-1".to_string(),
            display_name: "Ada".to_string(),
            id_token: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let context = SessionContext::new();
        assert!(!context.is_signed_in().await);

        context.sign_in(user()).await;
        assert_eq!(context.current().await.unwrap().user_id, "u-1");

        context.sign_out().await;
        assert!(context.current().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_survives_sign_out() {
        let context = SessionContext::new();
        let shared = context.clone();
        context.sign_in(user()).await;

        let snapshot = shared.current().await.unwrap();
        context.sign_out().await;
        assert_eq!(snapshot.display_name, "Ada");
        assert!(!shared.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_sign_in_replaces_previous_session() {
        let context = SessionContext::new();
        let first = context.sign_in(user()).await;
        let second = context
            .sign_in(UserSession {
                user_id: "u-2".to_string(),
                ..user()
            })
            .await;

        assert_eq!(first.user_id, "u-1");
        assert_eq!(context.current().await.unwrap(), second);
    }
}
