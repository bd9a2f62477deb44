//! Delivery clients - send one message to one recipient
//!
//! - AppleScriptDeliveryClient: macOS Messages (iMessage) driven through osascript
//! - HttpDeliveryClient: JSON POST to an SMS/iMessage gateway
//! - LoggingDeliveryClient: dry run, logs and succeeds

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tokio::process::Command;
use tp_common::Recipient;
use tp_config::{AppleScriptConfig, DeliveryBackend, DeliveryConfig, HttpDeliveryConfig};
use tracing::{debug, info, warn};

use crate::error::{DeliveryError, DispatchError};

/// Trait for message delivery
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<(), DeliveryError>;
}

/// Build the client selected by `config.backend`.
pub fn create_delivery_client(config: &DeliveryConfig) -> Result<Arc<dyn DeliveryClient>, DispatchError> {
    let client: Arc<dyn DeliveryClient> = match config.backend {
        DeliveryBackend::AppleScript => Arc::new(AppleScriptDeliveryClient::new(config.applescript.clone())),
        DeliveryBackend::Http => Arc::new(HttpDeliveryClient::new(config.http.clone())?),
        DeliveryBackend::Log => Arc::new(LoggingDeliveryClient),
    };
    info!(backend = ?config.backend, "Delivery client initialized");
    Ok(client)
}

// ============================================================================
// AppleScript (macOS Messages)
// ============================================================================

/// Recipient and body arrive as `argv`, so neither is ever spliced into the
/// script source.
const SEND_SCRIPT: &[&str] = &[
    "on run argv",
    "tell application \"Messages\"",
    "set targetService to 1st service whose service type = iMessage",
    "set targetBuddy to buddy (item 1 of argv) of targetService",
    "send (item 2 of argv) to targetBuddy",
    "end tell",
    "end run",
];

pub struct AppleScriptDeliveryClient {
    config: AppleScriptConfig,
}

impl AppleScriptDeliveryClient {
    pub fn new(config: AppleScriptConfig) -> Self {
        Self { config }
    }

    fn command(&self, recipient: &Recipient, message: &str) -> Command {
        let mut cmd = Command::new(&self.config.osascript_path);
        for line in SEND_SCRIPT {
            cmd.arg("-e").arg(line);
        }
        cmd.arg(recipient.as_str()).arg(message);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl DeliveryClient for AppleScriptDeliveryClient {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<(), DeliveryError> {
        let output = self.command(recipient, message).output().await?;

        if output.status.success() {
            info!(recipient = %recipient, "Message sent successfully");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(recipient = %recipient, stderr = %stderr, "osascript failed");
            Err(DeliveryError::Script {
                status: output.status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}

// ============================================================================
// HTTP gateway
// ============================================================================

#[derive(Debug, Serialize)]
struct GatewayPayload<'a> {
    recipient: &'a str,
    message: &'a str,
}

pub struct HttpDeliveryClient {
    client: Client,
    config: HttpDeliveryConfig,
}

impl HttpDeliveryClient {
    pub fn new(config: HttpDeliveryConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(url = %config.url, timeout_secs = config.timeout_secs, "HttpDeliveryClient initialized");
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&self.config.url).json(&GatewayPayload {
            recipient: recipient.as_str(),
            message,
        });

        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        debug!(recipient = %recipient, url = %self.config.url, "Posting message to gateway");

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            info!(recipient = %recipient, status_code = status.as_u16(), "Message sent successfully");
            Ok(())
        } else {
            warn!(recipient = %recipient, status_code = status.as_u16(), "Gateway rejected message");
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

// ============================================================================
// Dry run
// ============================================================================

/// Logs the send and reports success.
pub struct LoggingDeliveryClient;

#[async_trait]
impl DeliveryClient for LoggingDeliveryClient {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<(), DeliveryError> {
        info!(recipient = %recipient, chars = message.chars().count(), "Dry run, message not sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Recipient {
        Recipient::parse("+15550000001").unwrap()
    }

    #[test]
    fn test_applescript_passes_text_as_arguments() {
        let client = AppleScriptDeliveryClient::new(AppleScriptConfig::default());
        let message = "say \"hi\" \\ end tell";
        let cmd = client.command(&recipient(), message);

        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(cmd.as_std().get_program(), "osascript");
        assert_eq!(args.len(), SEND_SCRIPT.len() * 2 + 2);
        assert_eq!(args[args.len() - 2], "+15550000001");
        assert_eq!(args[args.len() - 1], message);
        // The message never appears inside a -e script line
        assert!(args[..args.len() - 2].iter().all(|a| !a.contains("say")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_applescript_success_on_zero_exit() {
        let client = AppleScriptDeliveryClient::new(AppleScriptConfig {
            osascript_path: "true".to_string(),
        });
        assert!(client.deliver(&recipient(), "hello").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_applescript_failure_on_nonzero_exit() {
        let client = AppleScriptDeliveryClient::new(AppleScriptConfig {
            osascript_path: "false".to_string(),
        });
        let err = client.deliver(&recipient(), "hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Script { status: 1, .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_applescript_missing_binary() {
        let client = AppleScriptDeliveryClient::new(AppleScriptConfig {
            osascript_path: "/nonexistent/osascript".to_string(),
        });
        let err = client.deliver(&recipient(), "hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_logging_client_always_succeeds() {
        assert!(LoggingDeliveryClient.deliver(&recipient(), "hello").await.is_ok());
    }

    #[test]
    fn test_factory_builds_log_backend() {
        let config = DeliveryConfig {
            backend: DeliveryBackend::Log,
            ..Default::default()
        };
        assert!(create_delivery_client(&config).is_ok());
    }
}
