use chrono::Utc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::delivery::Delivery;
use crate::models::proof::{ProofOfDelivery, ProofSubmission};

/// Check a proof submission against its delivery and build the record to
/// persist. At least one evidence field must be present; a supplied otp
/// must match the delivery's confirmation code.
pub fn validate(
    delivery: &Delivery,
    submission: &ProofSubmission,
) -> Result<ProofOfDelivery, EngineError> {
    if submission.photo_url.is_none() && submission.signature.is_none() && submission.otp.is_none()
    {
        return Err(EngineError::ProofInsufficient(
            "at least one of photo_url, signature or otp is required".to_string(),
        ));
    }

    if let Some(location) = &submission.location {
        if !location.is_valid() {
            return Err(EngineError::InvalidCoordinate {
                lat: location.lat,
                lng: location.lng,
            });
        }
    }

    if let Some(otp) = &submission.otp {
        let Some(code) = &delivery.confirmation_code else {
            return Err(EngineError::ProofInsufficient(
                "delivery has no confirmation code to match an otp against".to_string(),
            ));
        };
        if !otp_matches(otp, code) {
            return Err(EngineError::OtpMismatch);
        }
    }

    Ok(ProofOfDelivery {
        id: Uuid::new_v4(),
        delivery_id: delivery.id,
        photo_url: submission.photo_url.clone(),
        signature: submission.signature.clone(),
        otp: submission.otp.clone(),
        location: submission.location,
        delivered_at: Utc::now(),
    })
}

// Constant-time so response timing does not leak how much of the code
// matched. Differing lengths still short-circuit, leaking only length.
fn otp_matches(submitted: &str, expected: &str) -> bool {
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}
