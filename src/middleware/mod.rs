pub mod auth;

pub use auth::{AuthContext, user_auth};
