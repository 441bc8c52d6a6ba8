//! # Command Outcome
//!
//! The envelope every command returns.
//!
//! ```text
//! Outcome::Success(CreateSaleResponse { .. })
//!     → { "success": true, "saleId": "...", "orderNumber": "ORD0314001", ... }
//!
//! Outcome::Failure(ApiError { code, message })
//!     → { "success": false, "code": "INSUFFICIENT_STOCK", "message": "..." }
//! ```
//!
//! Response payloads are flattened next to `success`, so they must
//! serialise as JSON objects.

use serde::{Serialize, Serializer};

use crate::error::{ApiError, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(ApiError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: Into<ApiError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err.into()),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Success<'a, T> {
            success: bool,
            #[serde(flatten)]
            value: &'a T,
        }

        #[derive(Serialize)]
        struct Failure<'a> {
            success: bool,
            code: ErrorCode,
            message: &'a str,
        }

        match self {
            Outcome::Success(value) => Success {
                success: true,
                value,
            }
            .serialize(serializer),
            Outcome::Failure(err) => Failure {
                success: false,
                code: err.code,
                message: &err.message,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Held {
        held_id: String,
    }

    #[test]
    fn test_success_is_flattened() {
        let outcome = Outcome::Success(Held {
            held_id: "h-1".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": true, "heldId": "h-1" })
        );
    }

    #[test]
    fn test_failure_shape() {
        let outcome: Outcome<Held> = Outcome::Failure(ApiError::validation("items is required"));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": false,
                "code": "VALIDATION_ERROR",
                "message": "items is required"
            })
        );
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<u8> = Ok::<u8, ApiError>(3).into();
        assert_eq!(ok.value(), Some(&3));

        let err: Outcome<u8> = Err::<u8, ApiError>(ApiError::business("closed")).into();
        assert!(!err.is_success());
        assert_eq!(err.error().map(|e| e.code), Some(ErrorCode::BusinessLogic));
    }
}
