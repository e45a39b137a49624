//! Request and response bodies for the HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Reply when nothing in the knowledge base matches.
pub const NO_MATCH_RESPONSE: &str = "I'm sorry, I don't understand that.";

/// Reply after a successful `POST /teach`.
pub const TAUGHT_RESPONSE: &str = "Thanks for teaching me!";

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
}

/// Body of `POST /teach`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachRequest {
    /// Question to learn; stored in normalized form.
    pub question: String,
    pub answer: String,
}

/// Successful reply from `POST /chat` and `POST /teach`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    #[must_use]
    pub fn no_match() -> Self {
        Self::new(NO_MATCH_RESPONSE)
    }
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
