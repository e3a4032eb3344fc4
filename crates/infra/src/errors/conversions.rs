//! Conversions from external infrastructure errors into domain errors.

use std::io::Error as IoError;

use fhirpull_domain::FhirPullError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FhirPullError);

impl From<InfraError> for FhirPullError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FhirPullError> for InfraError {
    fn from(value: FhirPullError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFhirPullError {
    fn into_fhirpull(self) -> FhirPullError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FhirPullError */
/* -------------------------------------------------------------------------- */

impl IntoFhirPullError for HttpError {
    fn into_fhirpull(self) -> FhirPullError {
        if self.is_timeout() {
            return FhirPullError::Network(format!("HTTP request timed out: {self}"));
        }

        if self.is_connect() {
            return FhirPullError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_decode() {
            return FhirPullError::InvalidResponse(format!("failed to decode response: {self}"));
        }

        if self.is_builder() {
            return FhirPullError::Internal(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => FhirPullError::NotFound(message),
                _ => FhirPullError::Http { status: code, message },
            };
        }

        FhirPullError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fhirpull())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → FhirPullError */
/* -------------------------------------------------------------------------- */

impl IntoFhirPullError for IoError {
    fn into_fhirpull(self) -> FhirPullError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => FhirPullError::NotFound(self.to_string()),
            ErrorKind::PermissionDenied => {
                FhirPullError::Io(format!("permission denied: {self}"))
            }
            _ => FhirPullError::Io(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_fhirpull())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → FhirPullError */
/* -------------------------------------------------------------------------- */

impl IntoFhirPullError for JsonError {
    fn into_fhirpull(self) -> FhirPullError {
        if self.is_io() {
            return FhirPullError::Io(self.to_string());
        }
        FhirPullError::InvalidResponse(format!("invalid JSON: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_fhirpull())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = IoError::new(std::io::ErrorKind::NotFound, "config.toml");
        let mapped: FhirPullError = InfraError::from(err).into();
        assert!(matches!(mapped, FhirPullError::NotFound(msg) if msg.contains("config.toml")));
    }

    #[test]
    fn malformed_json_maps_to_invalid_response() {
        let err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let mapped: FhirPullError = InfraError::from(err).into();
        assert!(matches!(mapped, FhirPullError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn http_status_401_maps_to_permanent_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: FhirPullError = InfraError::from(error).into();
        assert!(mapped.is_unauthorized(), "got {mapped:?}");
        assert_eq!(mapped.status(), Some(401));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: FhirPullError = InfraError::from(error).into();
        assert!(matches!(mapped, FhirPullError::Network(msg) if msg.contains("connection")));
    }
}
