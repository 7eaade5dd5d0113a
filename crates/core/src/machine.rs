//! Machine type enum and endpoint helpers.
//!
//! A machine is an external compute endpoint capable of executing a
//! workflow. The type determines the dispatch request shape and the
//! retry policy applied during delivery.

use crate::error::CoreError;

/// Machine endpoint variants, matching the `machine_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineType {
    /// Generic serverless endpoint: `POST {endpoint}/run` with an
    /// `{"input": {...}}` envelope, no authentication.
    Serverless,
    /// Serverless endpoint requiring a bearer auth token (unless the
    /// endpoint is local).
    TokenServerless,
    /// Classic self-hosted instance running the bridge agent:
    /// `POST {endpoint}/runbridge/run` with a bare payload.
    Classic,
}

impl MachineType {
    /// Parse from the database `machine_type` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "serverless" => Ok(Self::Serverless),
            "token-serverless" => Ok(Self::TokenServerless),
            "classic" => Ok(Self::Classic),
            other => Err(CoreError::Validation(format!(
                "Unknown machine type '{other}'. Must be one of: serverless, token-serverless, classic"
            ))),
        }
    }

    /// Database name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Serverless => "serverless",
            Self::TokenServerless => "token-serverless",
            Self::Classic => "classic",
        }
    }
}

/// Whether an endpoint points at the local host. Token-authenticated
/// machines skip the bearer-token requirement for local endpoints so
/// development instances work without credentials.
pub fn is_local_endpoint(endpoint: &str) -> bool {
    endpoint.contains("localhost") || endpoint.contains("127.0.0.1")
}

// ---------------------------------------------------------------------------
// Run origins
// ---------------------------------------------------------------------------

/// Run triggered from the web UI.
pub const ORIGIN_MANUAL: &str = "manual";
/// Run triggered through the public API.
pub const ORIGIN_API: &str = "api";
/// Run triggered from a shared workflow page.
pub const ORIGIN_PUBLIC_SHARE: &str = "public-share";

/// All valid origin tags.
pub const VALID_ORIGINS: &[&str] = &[ORIGIN_MANUAL, ORIGIN_API, ORIGIN_PUBLIC_SHARE];

/// Validate an origin tag.
pub fn validate_origin(origin: &str) -> Result<(), CoreError> {
    if VALID_ORIGINS.contains(&origin) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid origin '{origin}'. Must be one of: {}",
            VALID_ORIGINS.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_type_from_name() {
        assert_eq!(
            MachineType::from_name("serverless").unwrap(),
            MachineType::Serverless
        );
        assert_eq!(
            MachineType::from_name("token-serverless").unwrap(),
            MachineType::TokenServerless
        );
        assert_eq!(
            MachineType::from_name("classic").unwrap(),
            MachineType::Classic
        );
        assert!(MachineType::from_name("gpu-cluster").is_err());
    }

    #[test]
    fn machine_type_round_trips() {
        for name in ["serverless", "token-serverless", "classic"] {
            assert_eq!(MachineType::from_name(name).unwrap().name(), name);
        }
    }

    #[test]
    fn local_endpoint_detection() {
        assert!(is_local_endpoint("http://localhost:8188"));
        assert!(is_local_endpoint("http://127.0.0.1:3000"));
        assert!(!is_local_endpoint("https://machine.example.com"));
    }

    #[test]
    fn origin_validation() {
        assert!(validate_origin("manual").is_ok());
        assert!(validate_origin("api").is_ok());
        assert!(validate_origin("public-share").is_ok());
        assert!(validate_origin("cron").is_err());
    }
}
