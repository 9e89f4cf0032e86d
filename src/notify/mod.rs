pub mod dispatch;
pub mod models;
pub mod store;
pub mod vapid;

pub use dispatch::{DeliveryReport, Dispatcher, broadcast, notify_user};
pub use models::{PushNotificationPayload, PushSubscription};
pub use store::{SqliteSubscriptionStore, SubscriptionStore};
pub use vapid::{VapidKeys, VapidSigner};
