//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use appdeploy::error::Hint;
use appdeploy::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::SshIdentityFileNotFound | ErrorCode::SshConnectFailed => 10,

        ErrorCode::RemoteCommandFailed | ErrorCode::SyncFailed => 20,

        ErrorCode::InternalIoError | ErrorCode::InternalJsonError => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdeploy::error::RemoteCommandFailedDetails;

    fn remote_failure() -> Error {
        Error::remote_command_failed(RemoteCommandFailedDetails {
            command: "sudo -n -- supervisorctl restart blog".to_string(),
            exit_code: 7,
            stdout: "some stdout".to_string(),
            stderr: "some stderr".to_string(),
            host: "dev.example.com".to_string(),
        })
    }

    #[test]
    fn remote_command_failed_serializes_stdout_stderr() {
        let json = CliResponse::<()>::from_error(&remote_failure())
            .to_json()
            .unwrap();

        assert!(json.contains("\"code\": \"remote.command_failed\""));
        assert!(json.contains("some stdout"));
        assert!(json.contains("some stderr"));
        assert!(json.contains("\"exitCode\": 7"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn remote_command_failed_maps_to_exit_code_20() {
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(remote_failure()));
        assert_eq!(exit_code, 20);
    }

    #[test]
    fn config_errors_map_to_exit_code_2() {
        let err = Error::config_missing_key("host", None);
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
        assert_eq!(exit_code, 2);
    }

    #[test]
    fn sync_failure_maps_to_exit_code_20() {
        let err = Error::sync_failed(appdeploy::error::SyncFailedDetails {
            source: "/src/blog".to_string(),
            destination: "dev.example.com:/home/deploy/blog".to_string(),
            exit_code: 23,
            error: "rsync: change_dir \"/src/blog\" failed".to_string(),
        });
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
        assert_eq!(exit_code, 20);
    }

    #[test]
    fn ssh_errors_map_to_exit_code_10() {
        let err = Error::ssh_connect_failed(appdeploy::error::SshConnectFailedDetails {
            host: "nonexistent.invalid".to_string(),
            command: "true".to_string(),
            stderr: "Could not resolve hostname".to_string(),
        });
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
        assert_eq!(exit_code, 10);
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (value, exit_code) = map_cmd_result_to_json(Ok((serde_json::json!({"ok": 1}), 0)));
        assert_eq!(exit_code, 0);
        assert_eq!(value.unwrap()["ok"], 1);
    }

    #[test]
    fn hints_are_omitted_when_empty() {
        let err = Error::internal_io("boom", None);
        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();
        assert!(!json.contains("hints"));

        let json = CliResponse::<()>::from_error(&err.with_hint("try again"))
            .to_json()
            .unwrap();
        assert!(json.contains("try again"));
    }
}
