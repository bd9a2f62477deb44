//! textpace dispatch
//!
//! - Validator: normalizes phone numbers and rejects malformed requests
//! - Dispatch loop: paced, ordered delivery with per-recipient failure isolation
//! - Dispatcher: fire-and-forget background tasks with an optional concurrency cap
//! - Delivery clients: osascript (Messages), HTTP gateway, dry run
//! - API: the HTTP endpoints

pub mod error;
pub mod validator;
pub mod pacing;
pub mod delivery;
pub mod dispatch;
pub mod dispatcher;
pub mod api;

pub use error::{DeliveryError, DispatchError, ValidationError};
pub use pacing::PacingPolicy;
pub use delivery::{
    create_delivery_client, AppleScriptDeliveryClient, DeliveryClient, HttpDeliveryClient,
    LoggingDeliveryClient,
};
pub use dispatch::{run_bulk, run_single, send_batch, BatchFailure};
pub use dispatcher::{Dispatcher, Submission};
pub use api::{create_router, AppState, ApiKeyAuth};
