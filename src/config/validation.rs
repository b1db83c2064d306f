use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::models::{AuthConfig, LoggingConfig, MetricsConfig, ServerConfig, StorageConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }
        errors.extend(Self::validate_auth(&config.auth));
        errors.extend(Self::validate_storage(&config.storage));
        errors.extend(Self::validate_metrics(&config.metrics));
        if let Err(e) = Self::validate_logging(&config.logging) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_auth(auth: &AuthConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if auth.username.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "auth.username".to_string(),
            });
        } else if auth.username.contains(':') {
            errors.push(ValidationError::InvalidField {
                field: "auth.username".to_string(),
                message: "Basic auth usernames cannot contain ':'".to_string(),
            });
        }

        if auth.password.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "auth.password".to_string(),
            });
        }

        if auth.realm.contains('"') {
            errors.push(ValidationError::InvalidField {
                field: "auth.realm".to_string(),
                message: "Realm cannot contain double quotes".to_string(),
            });
        }

        errors
    }

    fn validate_storage(storage: &StorageConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let StorageConfig::Sqlite {
            path,
            busy_timeout_ms,
        } = storage
        {
            if path.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    field: "storage.path".to_string(),
                });
            }
            if *busy_timeout_ms == 0 {
                errors.push(ValidationError::InvalidField {
                    field: "storage.busy_timeout_ms".to_string(),
                    message: "Busy timeout must be greater than 0".to_string(),
                });
            }
        }

        errors
    }

    fn validate_metrics(metrics: &MetricsConfig) -> Vec<ValidationError> {
        let buckets = &metrics.duration_buckets;
        let field = "metrics.duration_buckets".to_string();

        if buckets.is_empty() {
            return vec![ValidationError::MissingField { field }];
        }
        if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return vec![ValidationError::InvalidField {
                field,
                message: "Buckets must be finite, positive numbers of seconds".to_string(),
            }];
        }
        if buckets.windows(2).any(|w| w[0] >= w[1]) {
            return vec![ValidationError::InvalidField {
                field,
                message: "Buckets must be strictly increasing".to_string(),
            }];
        }

        Vec::new()
    }

    fn validate_logging(logging: &LoggingConfig) -> ValidationResult<()> {
        EnvFilter::try_new(&logging.level)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: e.to_string(),
            })
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} configuration errors:", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("\n  {}. {}", i + 1, error));
        }
        message
    }
}
