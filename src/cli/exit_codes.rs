//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::broadcast::BroadcastError;
use crate::core::codec::CodecError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Data validation failed
    pub const VALIDATION_FAILED: u8 = 17;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success
    Success,

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success
    }

    /// Error with explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Classify an error by the first typed cause found in its chain
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(classify)
            .unwrap_or(ExitCodes::ERROR);
        Self::Error(code, format!("{:#}", err))
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Error(_, msg) => Some(msg),
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

fn io_code(err: &std::io::Error) -> u8 {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => ExitCodes::FILE_NOT_FOUND,
        ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
        ErrorKind::ConnectionRefused => ExitCodes::CONNECTION_FAILED,
        _ => ExitCodes::ERROR,
    }
}

fn classify(cause: &(dyn std::error::Error + 'static)) -> Option<u8> {
    if let Some(err) = cause.downcast_ref::<TransportError>() {
        return Some(match err {
            TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
            TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
            TransportError::InvalidConfiguration(_) => ExitCodes::INVALID_ARGS,
            TransportError::Capture { .. } => ExitCodes::VALIDATION_FAILED,
            TransportError::IoError(e) => io_code(e),
            TransportError::ConnectionFailed(_) | TransportError::Disconnected => {
                ExitCodes::CONNECTION_FAILED
            }
        });
    }
    if cause.downcast_ref::<ConfigError>().is_some() {
        return Some(ExitCodes::CONFIG_ERROR);
    }
    if let Some(err) = cause.downcast_ref::<BroadcastError>() {
        return Some(match err {
            BroadcastError::Resolve(_) => ExitCodes::INVALID_ARGS,
            BroadcastError::Io(_) => ExitCodes::CONNECTION_FAILED,
        });
    }
    if cause.downcast_ref::<CodecError>().is_some() {
        return Some(ExitCodes::VALIDATION_FAILED);
    }
    cause.downcast_ref::<std::io::Error>().map(io_code)
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        14 => "Port not found",
        17 => "Validation failed",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 6, 7, 8, 14, 17, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_io_error_codes() {
        let err = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file missing",
        ));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::FILE_NOT_FOUND);

        let err = anyhow::Error::new(TransportError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "capture.txt",
        )));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::PERMISSION_DENIED);
    }

    #[test]
    fn test_bad_capture_is_validation_failure() {
        let err = crate::core::transport::ReplaySource::from_capture("AA 55\nnot hex\n")
            .err()
            .unwrap();
        let result = CliResult::from_error(&anyhow::Error::new(err).context("loading replay"));
        assert_eq!(result.code(), ExitCodes::VALIDATION_FAILED);
        assert!(result.message().unwrap().contains("line 2"));

        let err = anyhow::Error::new(CodecError::InvalidFormat("ZZ".to_string()));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::VALIDATION_FAILED);
    }

    #[test]
    fn test_classify_error_chain() {
        let err = anyhow::Error::new(TransportError::PortNotFound("/dev/ttyUSB9".to_string()))
            .context("opening bus");
        let result = CliResult::from_error(&err);
        assert_eq!(result.code(), ExitCodes::PORT_NOT_FOUND);
        assert!(result.message().unwrap().contains("/dev/ttyUSB9"));

        let err = anyhow::Error::new(ConfigError::NoConfigDir);
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::CONFIG_ERROR);

        let err = anyhow::anyhow!("something else");
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::ERROR);
    }
}
