pub mod cookie;
pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::JwtKeys;
pub use session::{require_session, AuthUser};
