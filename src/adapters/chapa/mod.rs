//! Chapa payment gateway adapters.

mod chapa_adapter;
mod mock_gateway;
mod signature;
mod wire;

pub use chapa_adapter::{ChapaGateway, ChapaGatewayConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use mock_gateway::MockPaymentGateway;
pub use signature::{
    hex_encode, sign_hex, verify_webhook_signature, SignatureError, SIGNATURE_HEADERS,
};
pub use wire::normalize_verification;
