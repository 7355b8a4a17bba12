pub mod auth;

pub use auth::{identify_user, issue_token, AuthUser, MaybeUser, UserClaims};
