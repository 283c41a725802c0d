// libs/notification-cell/src/services/pwa.rs
use std::sync::OnceLock;

use async_trait::async_trait;
use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::PushSubscription;
use crate::services::notification::NotificationService;

pub const INSTALLABLE_FLAG: &str = "pwa-installable";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PwaError {
    #[error("Notificaciones no soportadas en este navegador")]
    NotSupported,

    #[error("Configuración de notificaciones incompleta")]
    NotConfigured,

    #[error("Permisos de notificación denegados")]
    PermissionDenied,

    #[error("No hay suscripción activa")]
    NoActiveSubscription,

    #[error("El prompt de instalación no está disponible en este momento")]
    PromptUnavailable,

    #[error("En iOS debes usar: Compartir → Añadir a pantalla de inicio")]
    IosManualInstall,

    #[error("Error al registrar el Service Worker: {0}")]
    ServiceWorker(String),

    #[error("Error al crear la suscripción: {0}")]
    Subscription(String),

    #[error("Error al registrar la suscripción en el servidor: {0}")]
    Sink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChoice {
    Accepted,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub choice: InstallChoice,
    pub message: String,
}

/// Browser capabilities the PWA context needs. Implemented over the real
/// browser APIs in the client and by fakes in tests.
#[async_trait]
pub trait PwaEnvironment: Send + Sync {
    fn has_service_worker(&self) -> bool;
    fn has_push_manager(&self) -> bool;
    fn user_agent(&self) -> String;
    fn is_display_standalone(&self) -> bool;

    fn stored_flag(&self, key: &str) -> Option<String>;
    fn store_flag(&self, key: &str, value: &str);
    fn remove_flag(&self, key: &str);

    async fn register_service_worker(&self) -> Result<(), PwaError>;
    async fn existing_subscription(&self) -> Result<Option<PushSubscription>, PwaError>;
    async fn request_permission(&self) -> Permission;
    async fn push_subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription, PwaError>;
    async fn push_unsubscribe(&self) -> Result<(), PwaError>;
    async fn show_install_prompt(&self) -> Result<InstallChoice, PwaError>;
}

/// Where a fresh browser subscription is registered.
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    async fn register(&self, user_id: Option<&str>, subscription: PushSubscription) -> Result<(), PwaError>;
    async fn remove(&self, user_id: Option<&str>) -> Result<(), PwaError>;
}

#[async_trait]
impl SubscriptionSink for NotificationService {
    async fn register(&self, user_id: Option<&str>, subscription: PushSubscription) -> Result<(), PwaError> {
        self.subscribe(user_id, subscription)
            .await
            .map_err(|e| PwaError::Sink(e.to_string()))
    }

    async fn remove(&self, user_id: Option<&str>) -> Result<(), PwaError> {
        self.unsubscribe(user_id).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PwaFlags {
    pub is_supported: bool,
    pub is_ios: bool,
    pub is_standalone: bool,
    pub is_installable: bool,
    pub is_subscribed: bool,
    pub is_ready: bool,
}

fn ios_pattern() -> &'static Regex {
    static IOS: OnceLock<Regex> = OnceLock::new();
    IOS.get_or_init(|| Regex::new(r"iPad|iPhone|iPod").expect("valid iOS pattern"))
}

fn decode_server_key(raw: &str) -> Result<Vec<u8>, PwaError> {
    let trimmed = raw.trim();
    URL_SAFE_NO_PAD
        .decode(trimmed.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .map_err(|_| PwaError::NotConfigured)
}

/// Per-session PWA state. Created once with `init` and passed to whoever
/// needs it; every flag change goes through its methods.
pub struct PwaContext<E: PwaEnvironment> {
    env: E,
    vapid_public_key: String,
    flags: PwaFlags,
    subscription: Option<PushSubscription>,
    deferred_prompt: bool,
}

impl<E: PwaEnvironment> PwaContext<E> {
    pub async fn init(env: E, vapid_public_key: impl Into<String>) -> Self {
        let is_supported = env.has_service_worker() && env.has_push_manager();
        let is_ios = ios_pattern().is_match(&env.user_agent());
        let is_standalone = env.is_display_standalone();

        let mut context = Self {
            env,
            vapid_public_key: vapid_public_key.into(),
            flags: PwaFlags {
                is_supported,
                is_ios,
                is_standalone,
                is_installable: false,
                is_subscribed: false,
                is_ready: false,
            },
            subscription: None,
            deferred_prompt: false,
        };

        if !is_standalone && context.env.stored_flag(INSTALLABLE_FLAG).as_deref() == Some("true") {
            context.flags.is_installable = true;
        }

        if is_supported {
            if let Err(e) = context.env.register_service_worker().await {
                warn!("[PWA] {}", e);
            }
            match context.env.existing_subscription().await {
                Ok(existing) => {
                    if existing.is_some() {
                        debug!("[PWA] Existing push subscription found");
                    }
                    context.flags.is_subscribed = existing.is_some();
                    context.subscription = existing;
                }
                Err(e) => warn!("[PWA] Could not check push subscription: {}", e),
            }
        }

        context.flags.is_ready = true;
        context
    }

    pub fn flags(&self) -> PwaFlags {
        self.flags
    }

    pub fn subscription(&self) -> Option<&PushSubscription> {
        self.subscription.as_ref()
    }

    /// The browser offered an install prompt. Ignored once installed.
    pub fn on_before_install_prompt(&mut self) {
        if self.flags.is_standalone {
            return;
        }
        self.deferred_prompt = true;
        self.flags.is_installable = true;
        self.env.store_flag(INSTALLABLE_FLAG, "true");
    }

    pub fn on_app_installed(&mut self) {
        info!("[PWA] App installed");
        self.flags.is_installable = false;
        self.flags.is_standalone = true;
        self.deferred_prompt = false;
        self.env.remove_flag(INSTALLABLE_FLAG);
    }

    /// Shows the deferred prompt. Without one, iOS users get manual
    /// instructions instead.
    pub async fn install(&mut self) -> Result<InstallOutcome, PwaError> {
        if !self.deferred_prompt {
            return Err(if self.flags.is_ios {
                PwaError::IosManualInstall
            } else {
                PwaError::PromptUnavailable
            });
        }

        let choice = self.env.show_install_prompt().await?;
        self.deferred_prompt = false;

        let message = match choice {
            InstallChoice::Accepted => {
                self.flags.is_installable = false;
                self.env.remove_flag(INSTALLABLE_FLAG);
                "App instalada correctamente"
            }
            InstallChoice::Dismissed => "Instalación cancelada",
        };

        Ok(InstallOutcome {
            choice,
            message: message.to_string(),
        })
    }

    /// Asks for permission, subscribes through the push manager and hands the
    /// subscription to `sink`. A denied permission leaves every flag as it was.
    pub async fn subscribe(&mut self, user_id: Option<&str>, sink: &dyn SubscriptionSink) -> Result<(), PwaError> {
        if !self.flags.is_supported {
            return Err(PwaError::NotSupported);
        }
        if self.vapid_public_key.trim().is_empty() {
            return Err(PwaError::NotConfigured);
        }
        let server_key = decode_server_key(&self.vapid_public_key)?;

        if self.env.request_permission().await != Permission::Granted {
            warn!("[PWA] Notification permission not granted");
            return Err(PwaError::PermissionDenied);
        }

        let subscription = self.env.push_subscribe(&server_key).await?;
        self.subscription = Some(subscription.clone());
        self.flags.is_subscribed = true;

        sink.register(user_id, subscription).await?;
        info!("[PWA] Push subscription stored on the server");
        Ok(())
    }

    pub async fn unsubscribe(&mut self, user_id: Option<&str>, sink: &dyn SubscriptionSink) -> Result<(), PwaError> {
        if self.subscription.is_none() {
            return Err(PwaError::NoActiveSubscription);
        }

        self.env.push_unsubscribe().await?;
        self.subscription = None;
        self.flags.is_subscribed = false;

        sink.remove(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionKeys;
    use crate::services::registry::SubscriptionRegistry;
    use crate::services::webpush::UnconfiguredSender;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
    const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Chrome/126.0";
    const VAPID_KEY: &str = "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

    struct FakeBrowser {
        user_agent: &'static str,
        supported: bool,
        standalone: bool,
        permission: Permission,
        existing: Option<PushSubscription>,
        install_choice: InstallChoice,
        storage: Mutex<HashMap<String, String>>,
        subscribe_calls: Mutex<usize>,
    }

    impl FakeBrowser {
        fn chrome() -> Self {
            Self {
                user_agent: CHROME_UA,
                supported: true,
                standalone: false,
                permission: Permission::Granted,
                existing: None,
                install_choice: InstallChoice::Accepted,
                storage: Mutex::new(HashMap::new()),
                subscribe_calls: Mutex::new(0),
            }
        }
    }

    fn subscription() -> PushSubscription {
        PushSubscription {
            endpoint: "https://fcm.googleapis.com/fcm/send/xyz".to_string(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: "BPk".to_string(),
                auth: "aGk".to_string(),
            },
        }
    }

    #[async_trait]
    impl PwaEnvironment for FakeBrowser {
        fn has_service_worker(&self) -> bool {
            self.supported
        }
        fn has_push_manager(&self) -> bool {
            self.supported
        }
        fn user_agent(&self) -> String {
            self.user_agent.to_string()
        }
        fn is_display_standalone(&self) -> bool {
            self.standalone
        }
        fn stored_flag(&self, key: &str) -> Option<String> {
            self.storage.lock().unwrap().get(key).cloned()
        }
        fn store_flag(&self, key: &str, value: &str) {
            self.storage.lock().unwrap().insert(key.to_string(), value.to_string());
        }
        fn remove_flag(&self, key: &str) {
            self.storage.lock().unwrap().remove(key);
        }
        async fn register_service_worker(&self) -> Result<(), PwaError> {
            Ok(())
        }
        async fn existing_subscription(&self) -> Result<Option<PushSubscription>, PwaError> {
            Ok(self.existing.clone())
        }
        async fn request_permission(&self) -> Permission {
            self.permission
        }
        async fn push_subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription, PwaError> {
            assert_eq!(application_server_key.len(), 65);
            *self.subscribe_calls.lock().unwrap() += 1;
            Ok(subscription())
        }
        async fn push_unsubscribe(&self) -> Result<(), PwaError> {
            Ok(())
        }
        async fn show_install_prompt(&self) -> Result<InstallChoice, PwaError> {
            Ok(self.install_choice)
        }
    }

    fn sink() -> NotificationService {
        NotificationService::new(SubscriptionRegistry::new(), Arc::new(UnconfiguredSender), VAPID_KEY)
    }

    #[tokio::test]
    async fn test_init_detects_environment() {
        let mut browser = FakeBrowser::chrome();
        browser.user_agent = IPHONE_UA;
        browser.existing = Some(subscription());

        let context = PwaContext::init(browser, VAPID_KEY).await;
        let flags = context.flags();

        assert!(flags.is_supported);
        assert!(flags.is_ios);
        assert!(flags.is_subscribed);
        assert!(flags.is_ready);
        assert!(!flags.is_installable);
    }

    #[tokio::test]
    async fn test_install_flow() {
        let mut context = PwaContext::init(FakeBrowser::chrome(), VAPID_KEY).await;

        assert_matches!(context.install().await, Err(PwaError::PromptUnavailable));

        context.on_before_install_prompt();
        assert!(context.flags().is_installable);
        assert_eq!(context.env.stored_flag(INSTALLABLE_FLAG).as_deref(), Some("true"));

        let outcome = context.install().await.unwrap();
        assert_eq!(outcome.choice, InstallChoice::Accepted);
        assert!(!context.flags().is_installable);
        assert!(context.env.stored_flag(INSTALLABLE_FLAG).is_none());
    }

    #[tokio::test]
    async fn test_installable_flag_restored_from_storage() {
        let browser = FakeBrowser::chrome();
        browser.store_flag(INSTALLABLE_FLAG, "true");

        let context = PwaContext::init(browser, VAPID_KEY).await;
        assert!(context.flags().is_installable);
    }

    #[tokio::test]
    async fn test_ios_without_prompt_gets_instructions() {
        let mut browser = FakeBrowser::chrome();
        browser.user_agent = IPHONE_UA;

        let mut context = PwaContext::init(browser, VAPID_KEY).await;
        assert_matches!(context.install().await, Err(PwaError::IosManualInstall));
    }

    #[tokio::test]
    async fn test_app_installed_event() {
        let mut context = PwaContext::init(FakeBrowser::chrome(), VAPID_KEY).await;
        context.on_before_install_prompt();

        context.on_app_installed();
        let flags = context.flags();
        assert!(flags.is_standalone);
        assert!(!flags.is_installable);

        context.on_before_install_prompt();
        assert!(!context.flags().is_installable);
    }

    #[tokio::test]
    async fn test_subscribe_registers_with_server() {
        let server = sink();
        let mut context = PwaContext::init(FakeBrowser::chrome(), VAPID_KEY).await;

        context.subscribe(Some("3"), &server).await.unwrap();
        context.subscribe(Some("3"), &server).await.unwrap();

        assert!(context.flags().is_subscribed);
        assert_eq!(server.registry().len().await, 1);
        assert!(server.registry().get(Some("3")).await.is_some());
    }

    #[tokio::test]
    async fn test_denied_permission_is_soft_failure() {
        let mut browser = FakeBrowser::chrome();
        browser.permission = Permission::Denied;
        let server = sink();

        let mut context = PwaContext::init(browser, VAPID_KEY).await;
        let before = context.flags();

        assert_matches!(context.subscribe(None, &server).await, Err(PwaError::PermissionDenied));
        assert_eq!(context.flags(), before);
        assert_eq!(*context.env.subscribe_calls.lock().unwrap(), 0);
        assert!(server.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_subscribe_requires_support_and_key() {
        let mut browser = FakeBrowser::chrome();
        browser.supported = false;
        let mut context = PwaContext::init(browser, VAPID_KEY).await;
        assert_matches!(context.subscribe(None, &sink()).await, Err(PwaError::NotSupported));

        let mut context = PwaContext::init(FakeBrowser::chrome(), "").await;
        assert_matches!(context.subscribe(None, &sink()).await, Err(PwaError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let server = sink();
        let mut context = PwaContext::init(FakeBrowser::chrome(), VAPID_KEY).await;

        assert_matches!(
            context.unsubscribe(Some("3"), &server).await,
            Err(PwaError::NoActiveSubscription)
        );

        context.subscribe(Some("3"), &server).await.unwrap();
        context.unsubscribe(Some("3"), &server).await.unwrap();

        assert!(!context.flags().is_subscribed);
        assert!(server.registry().is_empty().await);
    }
}
