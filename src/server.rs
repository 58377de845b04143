//! HTTP front end: one scrape per `GET <metrics_path>?target=...`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::exposition::{render, CONTENT_TYPE};
use crate::routeros::Connector;
use crate::scrape::{ScrapeOptions, Scraper};
use crate::session::Target;

pub struct AppState {
    pub config: Config,
    pub connector: Arc<dyn Connector>,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    let metrics_path = state.config.exporter.metrics_path.clone();
    Router::new()
        .route("/", get(handle_landing))
        .route("/health", get(handle_health))
        .route(&metrics_path, get(handle_metrics))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScrapeQuery {
    target: Option<String>,
    user: Option<String>,
    password: Option<String>,
    port: Option<String>,
    collect_bgp: Option<String>,
    collect_ppp: Option<String>,
    collect_wireless: Option<String>,
}

impl ScrapeQuery {
    /// Query flags layered over the configured defaults.
    fn options(&self, defaults: ScrapeOptions) -> ScrapeOptions {
        ScrapeOptions {
            collect_bgp: query_flag("collect_bgp", self.collect_bgp.as_deref(), defaults.collect_bgp),
            collect_ppp: query_flag("collect_ppp", self.collect_ppp.as_deref(), defaults.collect_ppp),
            collect_wireless: query_flag(
                "collect_wireless",
                self.collect_wireless.as_deref(),
                defaults.collect_wireless,
            ),
        }
    }
}

/// Boolean spellings accepted on the query string: `1 t T TRUE true True`
/// and their false counterparts. Absent or empty falls back to `default`;
/// anything else reads as false.
fn query_flag(name: &str, value: Option<&str>, default: bool) -> bool {
    match value {
        None | Some("") => default,
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => true,
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => false,
        Some(other) => {
            warn!(param = name, value = other, "unrecognized boolean, treating as false");
            false
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

pub(crate) async fn handle_metrics(
    State(state): State<SharedState>,
    Query(query): Query<ScrapeQuery>,
) -> Response {
    let target = match query.target.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => return bad_request("'target' parameter is missing"),
    };

    let exporter = &state.config.exporter;
    let username = match query.user.as_deref() {
        Some(u) if !u.is_empty() => u,
        _ => {
            debug!(address = %target, default = %exporter.default_username, "'user' missing, using default");
            exporter.default_username.as_str()
        }
    };
    let port = match query.port.as_deref() {
        None | Some("") => None,
        Some(p) => match p.parse::<u16>() {
            Ok(port) if port > 0 => Some(port),
            _ => return bad_request("'port' parameter is not a valid port number"),
        },
    };

    let options = query.options(state.config.collectors.options());

    let target = Target::new(target, username, query.password.as_deref().unwrap_or_default())
        .with_port(port)
        .with_default_port(exporter.default_port)
        .with_timeout(state.config.scrape_timeout());
    info!(
        address = %target.socket_address(),
        user = %target.username,
        collect_bgp = options.collect_bgp,
        collect_ppp = options.collect_ppp,
        collect_wireless = options.collect_wireless,
        "processing scrape request"
    );

    let result = Scraper::new(target, state.connector.clone(), options).scrape().await;
    let body = render(&result.samples());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

pub(crate) async fn handle_landing(State(state): State<SharedState>) -> Html<String> {
    let path = &state.config.exporter.metrics_path;
    Html(format!(
        "<html>\n\
         <head><title>MikroTik Exporter</title></head>\n\
         <body>\n\
         <h1>MikroTik Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         <p>Scrape a router with <code>{path}?target=&lt;address&gt;&amp;user=&lt;user&gt;&amp;password=&lt;password&gt;</code></p>\n\
         </body>\n\
         </html>\n"
    ))
}

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}
