use thiserror::Error;

use crate::model::Requirement;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Unable to download {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid manifest for {location}: {reason}")]
    Manifest { location: String, reason: String },

    #[error("Unable to create resource for bundle {location}: {reason}")]
    Build { location: String, reason: String },

    #[error("{0}")]
    Graph(String),

    #[error("The following feature(s) may not exist or cannot be resolved: [{}]", .features.join(", "))]
    FeatureResolution {
        features: Vec<String>,
        #[source]
        source: ResolutionFailure,
    },

    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    #[error("Invalid version '{text}': {reason}")]
    Version { text: String, reason: String },

    #[error("Invalid requirement '{text}': {reason}")]
    Requirement { text: String, reason: String },

    #[error("{} artifact(s) could not be processed:\n  {}", .0.len(), format_failures(.0))]
    Multiple(Vec<PlanError>),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for URL handlers: {}", protocols.join(", "))]
    HandlerTimeout { protocols: Vec<String> },

    #[error("no handler configured for '{0}' locations")]
    Unsupported(String),

    #[error("download aborted: {0}")]
    Aborted(String),

    #[error("{0}")]
    Other(String),
}

/// Diagnostic returned by a resolver when mandatory requirements stay unsatisfied.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ResolutionFailure {
    pub message: String,
    pub unresolved: Vec<Requirement>,
}

impl ResolutionFailure {
    pub fn new(unresolved: Vec<Requirement>) -> Self {
        let message = match unresolved.first() {
            Some(first) => format!(
                "Unable to resolve {}: missing requirement {}",
                first.owner, first
            ),
            None => "Unable to resolve: no solution found".to_string(),
        };
        Self {
            message,
            unresolved,
        }
    }
}

impl PlanError {
    pub(crate) fn version(text: &str, reason: impl Into<String>) -> Self {
        PlanError::Version {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

fn format_failures(failures: &[PlanError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_resolution_message_lists_names() {
        let err = PlanError::FeatureResolution {
            features: vec!["foo".to_string(), "bar".to_string()],
            source: ResolutionFailure::new(Vec::new()),
        };
        assert_eq!(
            err.to_string(),
            "The following feature(s) may not exist or cannot be resolved: [foo, bar]"
        );
    }

    #[test]
    fn test_handler_timeout_is_a_fetch_failure() {
        let err = PlanError::Fetch {
            location: "wrap:mvn:g/a/1.0".to_string(),
            source: FetchError::HandlerTimeout {
                protocols: vec!["wrap".to_string()],
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("Unable to download wrap:mvn:g/a/1.0"));
        assert!(msg.contains("URL handlers: wrap"));
    }

    #[test]
    fn test_multiple_failures_are_enumerated() {
        let err = PlanError::Multiple(vec![
            PlanError::Graph("first".to_string()),
            PlanError::Graph("second".to_string()),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 artifact(s)"));
        assert!(msg.contains("first"));
        assert!(msg.contains("second"));
    }
}
