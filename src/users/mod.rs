use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::{auth::require_session, state::AppState};

mod dto;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod repo;
pub mod repo_types;
mod upload;
mod validation;

/// Account routes, mounted under `/api/user`.
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/getuser", get(handlers::get_user))
        .route("/updateuser", patch(handlers::update_user))
        .route("/updatepassword", patch(handlers::update_password))
        .route(
            "/uploadphoto",
            post(handlers::upload_photo).layer(DefaultBodyLimit::max(upload::MAX_PHOTO_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/loginstatus", get(handlers::login_status))
        .route("/forgotpassword", post(handlers::forgot_password))
        .route("/resetpassword/:token", put(handlers::reset_password))
        .merge(protected)
}
