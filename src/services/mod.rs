pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginOutcome, LoginResult, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;
