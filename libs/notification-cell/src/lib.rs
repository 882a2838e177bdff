pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;
pub mod transport;

pub use error::NotificationError;
pub use handlers::NotificationState;
pub use models::*;
pub use router::create_notification_router;
pub use services::*;
pub use store::{NotificationStore, SupabaseNotificationStore};
pub use transport::{TransportClient, TransportError, TwilioWhatsAppClient};
