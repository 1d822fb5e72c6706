//! Module proxy error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The classification of a [ProxyError].
///
/// The kind is carried unchanged through every layer that wraps an error,
/// so callers can branch on it regardless of how much context was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The module or version does not exist, in the cache or upstream.
    NotFound,

    /// The request itself was malformed.
    BadRequest,

    /// Anything not covered by the other kinds.
    Unexpected,

    /// The upstream (or this proxy) refused the request due to load.
    RateLimited,

    /// An upstream call did not complete in time.
    GatewayTimeout,

    /// The requested operation is not supported by this collaborator.
    MethodNotImplemented,
}

impl ErrorKind {
    /// The http status code that best describes this kind of failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Unexpected => 500,
            Self::RateLimited => 429,
            Self::GatewayTimeout => 504,
            Self::MethodNotImplemented => 501,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The module proxy error type. This type is used in all collaborator
/// apis as well as internally by the orchestration layer.
///
/// This type is required to implement `Clone` so that the outcome of a
/// single deduplicated fetch can be handed to every waiting caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {ctx} (src: {src})")]
pub struct ProxyError {
    /// The classification of this error.
    pub kind: ErrorKind,

    /// Any context associated with this error.
    pub ctx: Arc<str>,

    /// The inner error (if any).
    #[source]
    pub src: DynInnerError,
}

impl ProxyError {
    /// Construct an error of the given kind with an inner source error.
    pub fn new_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        kind: ErrorKind,
        ctx: C,
        src: S,
    ) -> Self {
        Self {
            kind,
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an error of the given kind.
    pub fn new<C: std::fmt::Display>(kind: ErrorKind, ctx: C) -> Self {
        Self {
            kind,
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Construct a "not found" error.
    pub fn not_found<C: std::fmt::Display>(ctx: C) -> Self {
        Self::new(ErrorKind::NotFound, ctx)
    }

    /// Construct a "bad request" error.
    pub fn bad_request<C: std::fmt::Display>(ctx: C) -> Self {
        Self::new(ErrorKind::BadRequest, ctx)
    }

    /// Construct an "unexpected" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::new(ErrorKind::Unexpected, ctx)
    }

    /// Construct an "unexpected" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::new_src(ErrorKind::Unexpected, ctx, src)
    }

    /// Wrap this error with additional context, preserving its kind.
    pub fn with_ctx<C: std::fmt::Display>(self, ctx: C) -> Self {
        Self {
            kind: self.kind,
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(self),
        }
    }

    /// Returns true if this error is of kind [ErrorKind::NotFound].
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// The module proxy result type.
pub type ProxyResult<T> = Result<T, ProxyError>;
