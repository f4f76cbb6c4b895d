use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("rpc {endpoint} unreachable: {message}")]
    Transport { endpoint: String, message: String },

    #[error("rpc {endpoint} returned a malformed block: {message}")]
    Decode { endpoint: String, message: String },

    #[error("rpc {endpoint} serves chain {found}, expected {expected}")]
    ChainIdentityMismatch {
        endpoint: String,
        expected: String,
        found: String,
    },

    #[error("no healthy rpc endpoint for {chain_id}")]
    NoHealthyEndpoint { chain_id: String },

    #[error("invalid block height {0:?}")]
    HeightParse(String),
}

impl RpcError {
    pub fn transport(endpoint: &str, message: impl ToString) -> Self {
        RpcError::Transport {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(endpoint: &str, message: impl ToString) -> Self {
        RpcError::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// True for failures that only mean "this block could not be read".
    /// Identity and exhaustion errors are reported separately.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            RpcError::Transport { .. } | RpcError::Decode { .. } | RpcError::HeightParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
