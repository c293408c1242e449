use thiserror::Error;

use crate::sources::SourceError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("request verification failed")]
    Unverified,
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "The request could not be verified.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::InvalidCommand(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Unverified => {
                Self::Unauthorized { message: "verification token mismatch".to_owned(), correlation_id }
            }
            ApplicationError::Source(SourceError::NotConfigured(kind)) => Self::Internal {
                message: format!("missing required credentials for {kind}"),
                correlation_id,
            },
            ApplicationError::Source(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError};
    use crate::sources::{SourceError, SourceKind};

    #[test]
    fn invalid_command_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::InvalidCommand("unknown subcommand".to_owned()).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn unverified_request_maps_to_unauthorized() {
        let interface = ApplicationError::Unverified.into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Unauthorized { .. }));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn upstream_error_maps_to_service_unavailable() {
        let interface = ApplicationError::from(SourceError::transport(SourceKind::Crm, "timeout"))
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn missing_credentials_map_to_internal() {
        let interface = ApplicationError::from(SourceError::NotConfigured(SourceKind::Analytics))
            .into_interface("req-4");

        assert!(matches!(
            interface,
            InterfaceError::Internal { ref message, .. }
                if message == "missing required credentials for analytics"
        ));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
