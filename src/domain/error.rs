use thiserror::Error;

/// Failures surfaced by the topology layer. Nothing here is retried.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("parsing {method} response")]
    Decode {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} raised: {message}")]
    Exception {
        method: &'static str,
        message: String,
    },

    #[error("node '{0}' not found in topology")]
    UnknownNode(String),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
