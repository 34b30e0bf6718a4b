pub mod auth_service;
pub mod geocoder;
pub mod mailer;
pub mod photos;

pub use auth_service::AuthService;
