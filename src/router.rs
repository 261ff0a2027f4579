use crate::auth::{handlers as auth_handlers, middleware::require_confirmed};
use crate::handlers;
use crate::middleware::add_security_headers;
use crate::AppState;
use axum::{middleware, routing::get, Router};
use tower_http::services::ServeDir;

/// All application routes. Session and tracing layers are added by the caller.
pub fn build_router(state: AppState) -> Router {
    // Unconfirmed accounts are turned away from these.
    let main_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/user/{username}", get(handlers::user_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_confirmed,
        ));

    let auth_routes = Router::new()
        .route(
            "/login",
            get(auth_handlers::login_page).post(auth_handlers::login_handler),
        )
        .route("/logout", get(auth_handlers::logout_handler))
        .route(
            "/register",
            get(auth_handlers::register_page).post(auth_handlers::register_handler),
        )
        .route("/confirm", get(auth_handlers::resend_confirmation_handler))
        .route("/confirm/{token}", get(auth_handlers::confirm_handler))
        .route("/unconfirmed", get(auth_handlers::unconfirmed_page))
        .route(
            "/change-password",
            get(auth_handlers::change_password_page).post(auth_handlers::change_password_handler),
        )
        .route(
            "/reset",
            get(auth_handlers::reset_request_page).post(auth_handlers::reset_request_handler),
        )
        .route(
            "/reset/{token}",
            get(auth_handlers::reset_password_page).post(auth_handlers::reset_password_handler),
        )
        .route(
            "/change-email",
            get(auth_handlers::change_email_page).post(auth_handlers::change_email_handler),
        )
        .route(
            "/change-email/{token}",
            get(auth_handlers::change_email_confirm_handler),
        );

    Router::new()
        .merge(main_routes)
        .merge(auth_routes)
        .nest_service("/static", ServeDir::new("static"))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            add_security_headers,
        ))
        .with_state(state)
}
