use thiserror::Error;

/// Machine-readable error classes shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetailerErrorKind {
    NotFound,
    RateLimit,
    Auth,
    Network,
    ServerError,
    CircuitOpen,
}

impl RetailerErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RetailerErrorKind::NotFound => "NOT_FOUND",
            RetailerErrorKind::RateLimit => "RATE_LIMIT",
            RetailerErrorKind::Auth => "AUTH",
            RetailerErrorKind::Network => "NETWORK",
            RetailerErrorKind::ServerError => "SERVER_ERROR",
            RetailerErrorKind::CircuitOpen => "CIRCUIT_OPEN",
        }
    }
}

impl std::fmt::Display for RetailerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RetailerError {
    #[error("{retailer}: not found: {detail}")]
    NotFound { retailer: String, detail: String },

    #[error("{retailer}: rate limited (retry after {retry_after_secs}s)")]
    RateLimited {
        retailer: String,
        retry_after_secs: u64,
    },

    #[error("{retailer}: authentication rejected with HTTP {status}")]
    Auth { retailer: String, status: u16 },

    #[error("{retailer}: network error: {message}")]
    Network { retailer: String, message: String },

    #[error(
        "{retailer}: upstream error{}: {message}",
        status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    Server {
        retailer: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{retailer}: circuit breaker is open")]
    CircuitOpen { retailer: String },
}

impl RetailerError {
    #[must_use]
    pub fn kind(&self) -> RetailerErrorKind {
        match self {
            RetailerError::NotFound { .. } => RetailerErrorKind::NotFound,
            RetailerError::RateLimited { .. } => RetailerErrorKind::RateLimit,
            RetailerError::Auth { .. } => RetailerErrorKind::Auth,
            RetailerError::Network { .. } => RetailerErrorKind::Network,
            RetailerError::Server { .. } => RetailerErrorKind::ServerError,
            RetailerError::CircuitOpen { .. } => RetailerErrorKind::CircuitOpen,
        }
    }

    /// Whether the same call may succeed later. `CircuitOpen` is retryable
    /// only once the breaker's cool-down has elapsed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RetailerError::NotFound { .. } | RetailerError::Auth { .. }
        )
    }

    #[must_use]
    pub fn retailer(&self) -> &str {
        match self {
            RetailerError::NotFound { retailer, .. }
            | RetailerError::RateLimited { retailer, .. }
            | RetailerError::Auth { retailer, .. }
            | RetailerError::Network { retailer, .. }
            | RetailerError::Server { retailer, .. }
            | RetailerError::CircuitOpen { retailer } => retailer,
        }
    }

    pub fn not_found(retailer: &str, detail: impl Into<String>) -> Self {
        RetailerError::NotFound {
            retailer: retailer.to_owned(),
            detail: detail.into(),
        }
    }

    pub fn network(retailer: &str, message: impl Into<String>) -> Self {
        RetailerError::Network {
            retailer: retailer.to_owned(),
            message: message.into(),
        }
    }

    pub fn server(retailer: &str, message: impl Into<String>) -> Self {
        RetailerError::Server {
            retailer: retailer.to_owned(),
            status: None,
            message: message.into(),
        }
    }

    /// Maps a non-2xx HTTP status to the shared taxonomy.
    ///
    /// 404 → not found, 429 → rate limit, 401/403 → auth, everything else →
    /// retryable server error.
    #[must_use]
    pub fn from_status(
        retailer: &str,
        status: u16,
        url: &str,
        retry_after_secs: Option<u64>,
    ) -> Self {
        match status {
            404 => RetailerError::not_found(retailer, url),
            429 => RetailerError::RateLimited {
                retailer: retailer.to_owned(),
                retry_after_secs: retry_after_secs.unwrap_or(60),
            },
            401 | 403 => RetailerError::Auth {
                retailer: retailer.to_owned(),
                status,
            },
            _ => RetailerError::Server {
                retailer: retailer.to_owned(),
                status: Some(status),
                message: format!("unexpected status from {url}"),
            },
        }
    }

    /// Classifies a transport failure from `reqwest`.
    #[must_use]
    pub fn from_reqwest(retailer: &str, err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(ToString::to_string).unwrap_or_default();
            return Self::from_status(retailer, status.as_u16(), &url, None);
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return RetailerError::network(retailer, err.to_string());
        }
        RetailerError::server(retailer, err.to_string())
    }
}
