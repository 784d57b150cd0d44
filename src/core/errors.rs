use thiserror::Error;

/// Footer appended to every user-facing failure message.
pub const SUPPORT_CONTACT: &str = "Contact the Corpora team on Slack: \
https://corpora.chat/slack or Discord: https://corpora.chat/discord";

/// Failures raised anywhere along the retrieval pipeline.
///
/// These never turn into HTTP error statuses. The route layer stringifies
/// them with [`PipelineError::user_message`] and ships the result inside a
/// regular 200 payload, so API clients always get a well-formed body.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {service}: {detail}")]
    InvalidResponse {
        service: &'static str,
        detail: String,
    },

    #[error("failed to read source '{path}': {source}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("history store error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl PipelineError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        PipelineError::Transport { service, source }
    }

    pub fn api(service: &'static str, status: u16, body: String) -> Self {
        PipelineError::Api {
            service,
            status,
            body,
        }
    }

    pub fn invalid_response<D: Into<String>>(service: &'static str, detail: D) -> Self {
        PipelineError::InvalidResponse {
            service,
            detail: detail.into(),
        }
    }

    /// Formats the error the way clients see it: the stringified cause
    /// followed by the support contact footer.
    pub fn user_message(&self) -> String {
        format!("An error occurred: Error message: {}. {}", self, SUPPORT_CONTACT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_cause_and_support_footer() {
        let err = PipelineError::api("pinecone", 401, "unauthorized".to_string());

        let message = err.user_message();

        assert!(message.starts_with("An error occurred: Error message: "));
        assert!(message.contains("pinecone returned HTTP 401: unauthorized"));
        assert!(message.contains("https://corpora.chat/slack"));
        assert!(message.contains("https://corpora.chat/discord"));
    }

    #[test]
    fn invalid_response_mentions_the_service() {
        let err = PipelineError::invalid_response("openai", "no embedding data");
        assert_eq!(
            err.to_string(),
            "unexpected response from openai: no embedding data"
        );
    }
}
