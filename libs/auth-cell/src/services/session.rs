use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use shared_api_client::TokenSource;
use shared_models::auth::{Token, Usuario};

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<Usuario>,
}

/// Shared token and current user. Clones point at the same session, so the
/// api client and the auth service observe each other's updates.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn save(&self, token: &Token) {
        let mut state = self.write();
        state.token = Some(token.access_token.clone());
        state.user = Some(token.usuario.clone());
        debug!("Session stored for {}", token.usuario.email);
    }

    pub fn set_user(&self, user: Usuario) {
        self.write().user = Some(user);
    }

    pub fn current_user(&self) -> Option<Usuario> {
        self.read().user.clone()
    }

    pub fn clear_session(&self) {
        let mut state = self.write();
        state.token = None;
        state.user = None;
    }
}

impl TokenSource for SessionStore {
    fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// A 401 ends the whole session, cached user included.
    fn clear(&self) {
        debug!("Session cleared after an unauthorized response");
        self.clear_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::auth::TipoUsuario;

    fn token() -> Token {
        Token {
            access_token: "abc.def.ghi".to_string(),
            token_type: "bearer".to_string(),
            usuario: Usuario {
                id: 3,
                email: "ana@example.com".to_string(),
                nombre: "Ana".to_string(),
                apellido: "López".to_string(),
                telefono: "5512345678".to_string(),
                tipo_usuario: TipoUsuario::Paciente,
                activo: true,
                fecha_registro: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            },
        }
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let shared = store.clone();

        store.save(&token());

        assert_eq!(shared.token().as_deref(), Some("abc.def.ghi"));
        assert_eq!(shared.current_user().map(|u| u.id), Some(3));
    }

    #[test]
    fn test_token_clear_drops_cached_user() {
        let store = SessionStore::new();
        store.save(&token());

        store.clear();

        assert!(store.token().is_none());
        assert!(store.current_user().is_none());
    }
}
