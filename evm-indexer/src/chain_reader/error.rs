use derive_more::Display;
use ethers::providers::{ProviderError, RpcError};

const RATE_LIMIT_MARKERS: [&str; 3] = ["rate limit", "too many requests", "limit exceeded"];
const SERVER_MARKERS: [&str; 3] = ["bad gateway", "service unavailable", "gateway timeout"];
const NETWORK_MARKERS: [&str; 8] = [
    "timeout",
    "timed out",
    "connection",
    "network",
    "econnreset",
    "econnrefused",
    "socket hang up",
    "broken pipe",
];

/// HTTP statuses only count as a whole word that leads the message or
/// follows one of [`STATUS_CODE_PREFIXES`], so digits inside hashes,
/// addresses and block numbers never match.
const RATE_LIMIT_STATUS_CODES: [&str; 1] = ["429"];
const SERVER_STATUS_CODES: [&str; 3] = ["502", "503", "504"];
const STATUS_CODE_PREFIXES: [&str; 4] = ["http", "status", "code", "error"];

/// JSON-RPC error codes nodes and providers use for throttling.
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ChainReaderError {
    #[display("block {_0} not found")]
    NotFound(u64),
    #[display("network error: {_0}")]
    Network(String),
    #[display("server error: {_0}")]
    Server(String),
    #[display("rate limited: {_0}")]
    RateLimited(String),
    #[display("invalid response: {_0}")]
    InvalidResponse(String),
    #[display("{_0}")]
    Other(String),
}

impl std::error::Error for ChainReaderError {}

impl ChainReaderError {
    /// Transport and node-side failures are expected to clear up on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainReaderError::Network(_)
                | ChainReaderError::Server(_)
                | ChainReaderError::RateLimited(_)
        )
    }

    pub fn classify(message: &str) -> Self {
        let lowercased = message.to_lowercase();
        let contains_any = |markers: &[&str]| markers.iter().any(|m| lowercased.contains(m));

        let words: Vec<&str> = lowercased
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has_status = |codes: &[&str]| {
            words.iter().enumerate().any(|(position, word)| {
                codes.contains(word)
                    && (position == 0 || STATUS_CODE_PREFIXES.contains(&words[position - 1]))
            })
        };

        if contains_any(&RATE_LIMIT_MARKERS) || has_status(&RATE_LIMIT_STATUS_CODES) {
            ChainReaderError::RateLimited(message.to_string())
        } else if contains_any(&SERVER_MARKERS) || has_status(&SERVER_STATUS_CODES) {
            ChainReaderError::Server(message.to_string())
        } else if contains_any(&NETWORK_MARKERS) {
            ChainReaderError::Network(message.to_string())
        } else {
            ChainReaderError::Other(message.to_string())
        }
    }

    fn from_error_response(code: i64, message: &str) -> Self {
        if RATE_LIMIT_CODES.contains(&code) {
            ChainReaderError::RateLimited(format!("{message} (code {code})"))
        } else {
            Self::classify(message)
        }
    }
}

impl From<ProviderError> for ChainReaderError {
    fn from(error: ProviderError) -> Self {
        let error_response = error
            .as_error_response()
            .map(|response| (response.code, response.message.clone()));

        if let Some((code, message)) = error_response {
            return Self::from_error_response(code, &message);
        }

        match error {
            ProviderError::HTTPError(error) => {
                let message = error.to_string();

                match Self::classify(&message) {
                    ChainReaderError::Other(message) => ChainReaderError::Network(message),
                    classified => classified,
                }
            }
            other_error => Self::classify(&other_error.to_string()),
        }
    }
}
