mod login;
mod logout;
mod password;
mod signup;
mod verify;

use axum::{Router, routing::post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(signup::sign_up))
        .route("/verify-code", post(verify::verify_code))
        .route("/sign-in", post(login::sign_in))
        .route("/sign-out", post(logout::sign_out))
}
