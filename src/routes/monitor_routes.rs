use axum::{Router, routing::{delete, get}};
use crate::{AppState, controllers::monitors_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/monitors",
            get(monitors_controller::get_monitors).post(monitors_controller::post_monitor),
        )
        .route("/api/monitors/:id", delete(monitors_controller::delete_monitor))
}
