//! notifyd: a lightweight real-time notification service.
//!
//! Clients append short text notifications, read the full history, and
//! receive live pushes of new notifications over a WebSocket.

pub mod app;
pub mod config;
pub mod errors;
pub mod routes;
pub mod services;
pub mod state;

pub use errors::{NotifyError, Result};
pub use services::broker::{SubscriberId, TopicBroker, NEW_NOTIFICATIONS};
pub use services::gateway::{Gateway, GatewayStats};
pub use services::session::{Session, SessionCanceller, SessionState};
pub use state::notifications::{Notification, NotificationStore};
