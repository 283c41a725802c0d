pub mod notification;
pub mod pwa;
pub mod registry;
pub mod webpush;

pub use notification::NotificationService;
pub use pwa::{
    InstallChoice, InstallOutcome, Permission, PwaContext, PwaEnvironment, PwaError, PwaFlags,
    SubscriptionSink,
};
pub use registry::SubscriptionRegistry;
pub use webpush::{PushSender, UnconfiguredSender, VapidSigner, WebPushSender};
