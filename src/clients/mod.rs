pub mod whatsapp_client;

pub use whatsapp_client::{NotificationSender, TemplateFields, WhatsAppClient};
