/// Errors from an experiment log backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A writer panicked while holding the log lock.
    #[error("Experiment log lock poisoned")]
    Poisoned,

    /// The durable store rejected the operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored definition could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from sending a fault specification to an agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The endpoint list is empty, so there is nowhere to send.
    #[error("No agent endpoints configured")]
    NoEndpoints,

    /// The request never produced a response.
    #[error("Request to agent at {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The agent answered with a non-success status.
    #[error("Agent at {endpoint} responded with status {status}")]
    Rejected { endpoint: String, status: u16 },
}

/// Reasons a fault is not started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FaultError {
    #[error("Unknown experiment type: {0}")]
    UnknownType(String),

    /// Destructive faults never fall back to an implicit target.
    #[error("process-kill requires an explicit kill_process pattern")]
    MissingKillPattern,

    #[error("Interface {0} already has an active network fault")]
    InterfaceBusy(String),
}

/// Errors launching an external program.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A task was submitted after the work queue shut down.
#[derive(Debug, thiserror::Error)]
#[error("Work queue closed, dropped task '{0}'")]
pub struct QueueClosed(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rejected() {
        let err = DispatchError::Rejected {
            endpoint: "http://a:9090/inject".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("http://a:9090/inject"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_transport_keeps_source() {
        use std::error::Error;
        let err = DispatchError::Transport {
            endpoint: "http://a:9090/inject".to_string(),
            source: Box::new(std::io::Error::other("connection refused")),
        };
        assert!(err.source().unwrap().to_string().contains("refused"));
    }

    #[test]
    fn test_registry_from_serde() {
        let serde_err = serde_json::from_str::<u8>("nope").unwrap_err();
        let err: RegistryError = serde_err.into();
        assert!(matches!(err, RegistryError::Serialization(_)));
    }

    #[test]
    fn test_display_missing_kill_pattern() {
        assert!(FaultError::MissingKillPattern
            .to_string()
            .contains("kill_process"));
    }
}
