use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to send a batch of messages to one phone number
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Phone number; spaces, hyphens and parentheses are ignored
    pub phone_number: Option<String>,
    /// Messages, sent in this order
    pub messages: Option<Vec<String>>,
}

/// Request to send the same batch of messages to several phone numbers
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendBulkMessagesRequest {
    /// Phone numbers, processed in this order; duplicates are sent to again
    pub phone_numbers: Option<Vec<String>>,
    /// Messages, sent in this order to every number
    pub messages: Option<Vec<String>>,
}

/// Work was accepted and will run in the background
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedResponse {
    pub success: bool,
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Request rejected
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Authentication failure body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnauthorizedResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
}
