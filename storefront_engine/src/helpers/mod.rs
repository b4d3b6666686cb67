mod gateway_signature;

pub use gateway_signature::{calculate_signature, signature_payload, verify_gateway_signature};
