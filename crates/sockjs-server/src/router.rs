//! Axum router wiring.
//!
//! Operational routes live at the root; every endpoint's SockJS routes are
//! nested under its prefix.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::{AppState, Endpoint};
use crate::ops;
use crate::transport::{eventsource, htmlfile, jsonp, pages, ws, xhr};

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state.clone());

    for ep in state.endpoints() {
        let routes = endpoint_router(Arc::clone(ep));
        app = if ep.prefix() == "/" {
            app.merge(routes)
        } else {
            app.nest(ep.prefix(), routes)
        };
    }
    app
}

pub fn endpoint_router(ep: Arc<Endpoint>) -> Router {
    Router::new()
        .route("/", get(pages::welcome))
        .route("/info", get(pages::info).options(pages::info_options))
        .route("/websocket", get(ws::raw_websocket))
        .route("/:file", get(pages::iframe))
        .route("/:server/:session/xhr", post(xhr::xhr_polling).options(xhr::xhr_options))
        .route(
            "/:server/:session/xhr_streaming",
            post(xhr::xhr_streaming).options(xhr::xhr_options),
        )
        .route("/:server/:session/xhr_send", post(xhr::xhr_send).options(xhr::xhr_options))
        .route("/:server/:session/eventsource", get(eventsource::eventsource))
        .route("/:server/:session/htmlfile", get(htmlfile::htmlfile))
        .route("/:server/:session/jsonp", get(jsonp::jsonp).options(jsonp::jsonp_options))
        .route("/:server/:session/jsonp_send", post(jsonp::jsonp_send))
        .route("/:server/:session/websocket", get(ws::websocket))
        .with_state(ep)
}
