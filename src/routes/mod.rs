pub mod users;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::SharedState;

pub fn user_routes() -> Router<SharedState> {
    Router::new()
        .route("/user/log-in", post(users::log_in))
        .route("/user", get(users::list).post(users::create))
        .route(
            "/user/{id}",
            get(users::get).patch(users::update).delete(users::delete),
        )
        .route("/user/restore/{id}", patch(users::restore))
}
