use std::{collections::BTreeMap, net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Query, State, rejection::JsonRejection},
        http::{StatusCode, header},
        response::{Html, IntoResponse, Response},
        routing::{MethodRouter, on},
    },
    axum_extra::extract::cookie::{Cookie, CookieJar},
    hubline_config::GatewayConfig,
    hubline_protocol::SessionFrame,
    hubline_sessions::SessionId,
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{debug, info},
};

use crate::{
    error::GatewayError,
    hub::{HubService, JsonAnswer},
    routes::Route,
    state::GatewayState,
};

/// Cookie carrying the web session between requests.
pub const SESSION_COOKIE: &str = "sessionid";

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

type AppState = Arc<GatewayState>;

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
///
/// Routes come from [`Route::ALL`]. Anything the table does not serve, wrong
/// method included, is a 404 with an empty body.
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for route in Route::ALL {
        let path = route.path(&state.app);
        let handler = route_handler(route);
        let merged = match by_path.remove(&path) {
            Some(existing) => existing.merge(handler),
            None => handler,
        };
        by_path.insert(path, merged);
    }

    let router = by_path
        .into_iter()
        .fold(Router::new(), |router, (path, methods)| {
            router.route(&path, methods.fallback(not_found))
        });

    router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn route_handler(route: Route) -> MethodRouter<AppState> {
    let filter = route.method_filter();
    match route {
        Route::TextGet => on(filter, text_get),
        Route::TextPost => on(filter, text_post),
        Route::JsonPost => on(filter, json_post),
        Route::MediaGet => on(filter, media_get),
        Route::LandingGet => on(filter, landing_get),
        Route::EchoPost => on(filter, echo_post),
    }
}

/// Start the HTTP gateway and serve until Ctrl-C.
pub async fn start_gateway(
    config: &GatewayConfig,
    app: &str,
    hub: Arc<dyn HubService>,
) -> anyhow::Result<()> {
    let state = GatewayState::new(app, hub);
    let router = build_gateway_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let hub_mode = format!("{:?}", config.hub).to_lowercase();
    let lines = [
        format!("hubline gateway v{}", state.version),
        format!("listening on {addr}"),
        format!("{} routes under /{app}", Route::ALL.len()),
        format!("hub: {hub_mode}"),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // Spawn idle-session pruning.
    let prune_state = Arc::clone(&state);
    let max_idle = Duration::from_secs(config.session_idle_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = prune_state.sessions.prune_idle(max_idle).await;
            if removed > 0 {
                let active = prune_state.sessions.count().await;
                info!(removed, active, "idle sessions pruned");
            }
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down gateway");
        })
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    sessionid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaQuery {
    mmd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonRequest {
    sessionid: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

fn required_session(raw: Option<&str>) -> Result<SessionId, GatewayError> {
    raw.and_then(|r| SessionId::parse(r).ok())
        .ok_or(GatewayError::MissingParameter("sessionid"))
}

fn session_reply(session: &SessionId, answer: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        SessionFrame::new(session.as_str(), answer).encode(),
    )
        .into_response()
}

fn session_cookie(session: &SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.to_string()))
        .path("/")
        .build()
}

async fn text_get(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Response, GatewayError> {
    let session = required_session(query.sessionid.as_deref())?;
    state.sessions.touch(&session).await;
    let answer = state.hub.text_answer(&session, None).await?;
    Ok(session_reply(&session, answer))
}

/// Session precedence: `sessionid` query, then cookie, then a new session.
async fn text_post(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    jar: CookieJar,
    body: String,
) -> Result<(CookieJar, Response), GatewayError> {
    let supplied = query
        .sessionid
        .filter(|s| !s.trim().is_empty())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()));
    let session = state.sessions.resolve_or_allocate(supplied.as_deref()).await;
    debug!(session = %session, bytes = body.len(), "text request");

    let answer = state.hub.text_answer(&session, Some(&body)).await?;
    let jar = jar.add(session_cookie(&session));
    Ok((jar, session_reply(&session, answer)))
}

async fn json_post(
    State(state): State<AppState>,
    payload: Result<Json<JsonRequest>, JsonRejection>,
) -> Result<Json<JsonAnswer>, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::MalformedBody(e.body_text()))?;
    let session = required_session(request.sessionid.as_deref())?;
    state.sessions.touch(&session).await;
    let text = request.text.as_deref().unwrap_or_default();
    Ok(Json(state.hub.json_answer(&session, text).await?))
}

async fn media_get(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> Result<Response, GatewayError> {
    let key = query
        .mmd
        .filter(|k| !k.trim().is_empty())
        .ok_or(GatewayError::MissingParameter("mmd"))?;
    let bytes = state.hub.media_answer(&key).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

async fn landing_get(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Html<String>) {
    let session = state.sessions.allocate().await;
    (jar.add(session_cookie(&session)), Html(state.hub.landing_page()))
}

async fn echo_post(body: Bytes) -> Bytes {
    body
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
