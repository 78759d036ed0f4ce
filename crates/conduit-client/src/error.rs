use conduit_protocol::RpcError;
use conduit_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The peer answered with an error reply.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The call was abandoned before any reply could settle it, e.g. its
    /// batch failed to send.
    #[error("call abandoned before a reply arrived")]
    Closed,

    #[error("unexpected result: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn rpc(&self) -> Option<&RpcError> {
        match self {
            ClientError::Rpc(err) => Some(err),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        self.rpc().map(|err| err.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_is_exposed() {
        let err = ClientError::from(RpcError::new("Division by zero").with_code(666).with_data("extra"));
        assert_eq!(err.to_string(), "Division by zero");
        assert_eq!(err.code(), Some(666));
        assert_eq!(err.rpc().and_then(|e| e.data.clone()), Some("extra".into()));

        assert_eq!(ClientError::Closed.code(), None);
    }
}
