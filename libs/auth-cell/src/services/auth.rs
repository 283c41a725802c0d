use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use doctor_cell::models::ProfessionalForm;
use shared_api_client::{ApiClient, ApiError, TokenSource};
use shared_config::AppConfig;
use shared_models::auth::{TipoUsuario, Token, Usuario, UsuarioLogin};
use shared_utils::jwt::{decode_claims, is_expired};

use crate::models::{AuthError, PatientRegistration};
use crate::services::session::SessionStore;

/// Login, registration and session lifecycle. The wrapped `ApiClient`
/// reads its bearer token from the same `SessionStore`.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    session: SessionStore,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let session = SessionStore::new();
        let api = ApiClient::new(config)?.with_token_source(Arc::new(session.clone()));
        Ok(Self { api, session })
    }

    /// Authenticated client for the other services.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn store(&self, token: &Token) {
        if token.access_token.is_empty() {
            warn!("Backend returned an empty access token, session not stored");
            return;
        }
        self.session.save(token);
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Token, AuthError> {
        debug!("Logging in {}", email);
        let credentials = UsuarioLogin {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let token: Token = self
            .api
            .post("/api/usuarios/login", &credentials)
            .await
            .map_err(|e| {
                error!("Login failed: {}", e);
                e
            })?;

        self.store(&token);
        info!("User {} logged in as {}", token.usuario.id, token.usuario.tipo_usuario);
        Ok(token)
    }

    pub async fn register_patient(&self, registration: &PatientRegistration) -> Result<Token, AuthError> {
        if registration.usuario.tipo_usuario != TipoUsuario::Paciente {
            return Err(AuthError::WrongAccountType("paciente"));
        }

        let token: Token = self.api.post("/api/registro/paciente", registration).await?;
        self.store(&token);
        info!("Patient {} registered", token.usuario.id);
        Ok(token)
    }

    /// Validates the professional form, drops duplicated schedule entries,
    /// then registers the account.
    pub async fn register_doctor(&self, form: ProfessionalForm) -> Result<Token, AuthError> {
        let registration = form.into_submission()?;
        if !registration.is_doctor_account() {
            return Err(AuthError::WrongAccountType("doctor"));
        }

        let token: Token = self.api.post("/api/registro/doctor", &registration).await?;
        self.store(&token);
        info!(
            "Doctor {} registered with {} schedule entries",
            token.usuario.id,
            registration.horarios.len()
        );
        Ok(token)
    }

    /// Refreshes the cached user from the backend.
    pub async fn me(&self) -> Result<Usuario, AuthError> {
        let user: Usuario = self.api.get("/api/usuarios/me").await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub async fn user(&self, user_id: i64) -> Result<Usuario, AuthError> {
        Ok(self.api.get(&format!("/api/usuarios/{}", user_id)).await?)
    }

    pub fn current_user(&self) -> Option<Usuario> {
        self.session.current_user()
    }

    pub fn logout(&self) {
        self.session.clear_session();
        info!("Session closed");
    }

    /// An expired token logs the session out. Undecodable tokens count as
    /// unauthenticated but are left in place.
    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.session.token() else {
            debug!("No token stored");
            return false;
        };

        match decode_claims(&token) {
            Ok(claims) if is_expired(&claims, now) => {
                debug!("Token expired");
                self.logout();
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!("Stored token could not be decoded: {}", e);
                false
            }
        }
    }

    pub async fn test_connection(&self) -> bool {
        self.api.test_connection().await
    }
}
