pub mod broker;
pub mod gateway;
pub mod session;
