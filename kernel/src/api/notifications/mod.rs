//! REST API endpoint for bulk WhatsApp notifications.

pub mod handlers;
pub mod types;

pub use handlers::send_whatsapp_notifications;
pub use types::{NotificationDetails, NotificationRequest, NotificationResponse};
