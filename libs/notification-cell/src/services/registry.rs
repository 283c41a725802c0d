use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{PushSubscription, DEFAULT_SUBSCRIPTION_KEY};

/// In-memory subscriptions, one per user. Anonymous subscribers share the
/// `"default"` slot. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Arc<RwLock<HashMap<String, PushSubscription>>>,
}

pub fn registry_key(user_id: Option<&str>) -> String {
    match user_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => DEFAULT_SUBSCRIPTION_KEY.to_string(),
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous subscription for the same key.
    pub async fn subscribe(&self, user_id: Option<&str>, subscription: PushSubscription) {
        let key = registry_key(user_id);
        debug!("Storing push subscription for {}", key);
        self.subscriptions.write().await.insert(key, subscription);
    }

    pub async fn unsubscribe(&self, user_id: Option<&str>) -> Option<PushSubscription> {
        let key = registry_key(user_id);
        self.subscriptions.write().await.remove(&key)
    }

    /// Removes the subscription only while it still points at `endpoint`,
    /// so a newer subscription stored meanwhile survives.
    pub async fn remove_if_endpoint(&self, user_id: Option<&str>, endpoint: &str) -> bool {
        let key = registry_key(user_id);
        let mut subscriptions = self.subscriptions.write().await;

        match subscriptions.get(&key).map(|current| current.endpoint == endpoint) {
            Some(true) => {
                subscriptions.remove(&key);
                true
            }
            Some(false) => {
                debug!("Subscription for {} was replaced, keeping it", key);
                false
            }
            None => false,
        }
    }

    pub async fn get(&self, user_id: Option<&str>) -> Option<PushSubscription> {
        self.subscriptions.read().await.get(&registry_key(user_id)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionKeys;

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: "key".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_missing_user_uses_default_slot() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(None, subscription("https://push.example/a")).await;
        registry.subscribe(Some("  "), subscription("https://push.example/b")).await;

        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.get(Some("default")).await.map(|s| s.endpoint),
            Some("https://push.example/b".to_string())
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_user() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(Some("3"), subscription("https://push.example/3")).await;
        registry.subscribe(Some("7"), subscription("https://push.example/7")).await;

        let removed = registry.unsubscribe(Some("3")).await;

        assert!(removed.is_some());
        assert!(registry.get(Some("3")).await.is_none());
        assert!(registry.get(Some("7")).await.is_some());
        assert!(registry.unsubscribe(Some("3")).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_if_endpoint_keeps_replaced_subscription() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(Some("3"), subscription("https://push.example/new")).await;

        assert!(!registry.remove_if_endpoint(Some("3"), "https://push.example/old").await);
        assert_eq!(
            registry.get(Some("3")).await.map(|s| s.endpoint),
            Some("https://push.example/new".to_string())
        );

        assert!(registry.remove_if_endpoint(Some("3"), "https://push.example/new").await);
        assert!(registry.get(Some("3")).await.is_none());
        assert!(!registry.remove_if_endpoint(Some("3"), "https://push.example/new").await);
    }
}
