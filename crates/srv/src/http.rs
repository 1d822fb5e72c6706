use axum::*;
use modproxy_api::*;
use modproxy_core::filter::{Filter, FilterRule};
use std::sync::Arc;

/// Catalog page size when the client asks for none.
const CATALOG_PAGE_SIZE: usize = 1000;

/// Largest catalog page size served.
const CATALOG_PAGE_SIZE_MAX: usize = 10000;

#[derive(Debug, Clone)]
pub struct AppState {
    pub proxy: Proxy,
    pub filter: Arc<Filter>,
    pub direct_proxy_url: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", routing::get(handle_health_get))
        .route("/catalog", routing::get(handle_catalog_get))
        .route("/*path", routing::get(handle_module_get))
        .with_state(state)
}

struct HttpResponse {
    status: u16,
    content_type: &'static str,
    body: body::Body,
}

impl HttpResponse {
    fn ok(content_type: &'static str, body: impl Into<body::Body>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
        }
    }

    fn error(status: u16, msg: impl std::fmt::Display) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "error": msg.to_string() })
                .to_string()
                .into(),
        }
    }

    fn respond(self) -> response::Response {
        response::Response::builder()
            .status(self.status)
            .header("Content-Type", self.content_type)
            .body(self.body)
            .expect("failed to encode response")
    }
}

/// Map an error to a response, keeping internal details out of 500s.
fn error_response(err: ProxyError) -> response::Response {
    let status = err.kind.http_status();
    match err.kind {
        ErrorKind::Unexpected => {
            tracing::error!(?err, "request failed");
            HttpResponse::error(status, "internal server error").respond()
        }
        ErrorKind::NotFound | ErrorKind::BadRequest => {
            tracing::debug!(%err, "request failed");
            HttpResponse::error(status, err).respond()
        }
        _ => {
            tracing::warn!(%err, "request failed");
            HttpResponse::error(status, err).respond()
        }
    }
}

async fn handle_health_get() -> response::Response {
    HttpResponse::ok("application/json", "{}").respond()
}

#[derive(Debug, serde::Deserialize)]
struct CatalogQuery {
    #[serde(default)]
    token: String,
    pagesize: Option<usize>,
}

async fn handle_catalog_get(
    extract::State(state): extract::State<AppState>,
    extract::Query(query): extract::Query<CatalogQuery>,
) -> response::Response {
    let page_size = query
        .pagesize
        .unwrap_or(CATALOG_PAGE_SIZE)
        .min(CATALOG_PAGE_SIZE_MAX);

    let page = match state.proxy.storage.catalog(&query.token, page_size).await
    {
        Ok(page) => page,
        Err(err) => return error_response(err.with_ctx("catalog")),
    };

    match serde_json::to_string(&page) {
        Ok(body) => HttpResponse::ok("application/json", body).respond(),
        Err(err) => {
            error_response(ProxyError::other_src("encode catalog", err))
        }
    }
}

/// A request within the protocol tree of a module.
#[derive(Debug, PartialEq)]
enum ModuleRequest {
    List { module: String },
    Latest { module: String },
    Info { module: String, version: String },
    GoMod { module: String, version: String },
    Zip { module: String, version: String },
}

impl ModuleRequest {
    /// Parse an escaped request path, without the leading slash.
    fn parse(path: &str) -> ProxyResult<Self> {
        if let Some(module) = path.strip_suffix("/@latest") {
            return Ok(Self::Latest {
                module: path::unescape(module)?,
            });
        }

        let (module, file) = path.rsplit_once("/@v/").ok_or_else(|| {
            ProxyError::not_found(format!("unknown path {path:?}"))
        })?;
        let module = path::unescape(module)?;

        if file == "list" {
            return Ok(Self::List { module });
        }

        let (version, ext) = file.rsplit_once('.').ok_or_else(|| {
            ProxyError::not_found(format!("unknown path {path:?}"))
        })?;
        let version = path::unescape(version)?;

        match ext {
            "info" => Ok(Self::Info { module, version }),
            "mod" => Ok(Self::GoMod { module, version }),
            "zip" => Ok(Self::Zip { module, version }),
            _ => Err(ProxyError::not_found(format!("unknown path {path:?}"))),
        }
    }

    fn module(&self) -> &str {
        match self {
            Self::List { module }
            | Self::Latest { module }
            | Self::Info { module, .. }
            | Self::GoMod { module, .. }
            | Self::Zip { module, .. } => module,
        }
    }

    fn version(&self) -> Option<&str> {
        match self {
            Self::List { .. } | Self::Latest { .. } => None,
            Self::Info { version, .. }
            | Self::GoMod { version, .. }
            | Self::Zip { version, .. } => Some(version),
        }
    }
}

async fn handle_module_get(
    extract::Path(path): extract::Path<String>,
    extract::State(state): extract::State<AppState>,
) -> response::Response {
    let req = match ModuleRequest::parse(&path) {
        Ok(req) => req,
        Err(err) => return error_response(err),
    };

    let rule = match req.version() {
        Some(version) => state.filter.rule_for_version(req.module(), version),
        None => state.filter.rule(req.module()),
    };

    match rule {
        FilterRule::Exclude => {
            tracing::debug!(module = req.module(), "excluded");
            return HttpResponse::error(
                403,
                format!("module {} is excluded", req.module()),
            )
            .respond();
        }
        FilterRule::Direct => {
            return match &state.direct_proxy_url {
                Some(url) => response::Response::builder()
                    .status(303)
                    .header(
                        "Location",
                        format!("{}/{path}", url.trim_end_matches('/')),
                    )
                    .body(body::Body::empty())
                    .expect("failed to encode response"),
                None => error_response(ProxyError::not_found(format!(
                    "module {} must be fetched directly",
                    req.module()
                ))),
            };
        }
        FilterRule::Include | FilterRule::Default => (),
    }

    match dispatch(&*state.proxy.protocol, req).await {
        Ok(res) => res.respond(),
        Err(err) => error_response(err),
    }
}

async fn dispatch(
    protocol: &dyn Protocol,
    req: ModuleRequest,
) -> ProxyResult<HttpResponse> {
    Ok(match req {
        ModuleRequest::List { module } => {
            let body: String = protocol
                .list(&module)
                .await?
                .into_iter()
                .map(|v| v + "\n")
                .collect();
            HttpResponse::ok("text/plain; charset=UTF-8", body)
        }
        ModuleRequest::Latest { module } => {
            let latest = protocol.latest(&module).await?;
            let body = serde_json::to_string(&latest).map_err(|err| {
                ProxyError::other_src(format!("encode latest {module}"), err)
            })?;
            HttpResponse::ok("application/json", body)
        }
        ModuleRequest::Info { module, version } => HttpResponse::ok(
            "application/json",
            protocol.info(&module, &version).await?,
        ),
        ModuleRequest::GoMod { module, version } => HttpResponse::ok(
            "text/plain; charset=UTF-8",
            protocol.go_mod(&module, &version).await?,
        ),
        ModuleRequest::Zip { module, version } => HttpResponse::ok(
            "application/zip",
            body::Body::from_stream(protocol.zip(&module, &version).await?),
        ),
    })
}
