pub mod notification_routes;
pub mod subscription_routes;
pub mod system_routes;
