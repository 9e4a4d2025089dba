//! Solution export: request payload, remote service and package writer
//!
//! The remote side is treated as an opaque call: send an
//! [`ExportSolutionRequest`], receive the packaged solution bytes. The
//! [`SolutionService`] trait is the seam between the export flow and the
//! transport, [`WebApiService`] is the CRM Web API implementation.

use crate::connection::ConnectionString;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while exporting a solution
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CRM service not ready")]
    NotReady,

    #[error("Invalid solution name: {0:?}")]
    InvalidSolutionName(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CRM service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Solution package is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payload of the remote `ExportSolution` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportSolutionRequest {
    pub solution_name: String,
    pub managed: bool,
    pub export_auto_numbering_settings: bool,
    pub export_calendar_settings: bool,
    pub export_customization_settings: bool,
    pub export_email_tracking_settings: bool,
    pub export_general_settings: bool,
    pub export_isv_config: bool,
    pub export_marketing_settings: bool,
    pub export_outlook_synchronization_settings: bool,
    pub export_relationship_roles: bool,
}

impl ExportSolutionRequest {
    /// Build a request with every settings flag set to `include_settings`
    pub fn new(solution_name: impl Into<String>, managed: bool, include_settings: bool) -> Self {
        Self {
            solution_name: solution_name.into(),
            managed,
            export_auto_numbering_settings: include_settings,
            export_calendar_settings: include_settings,
            export_customization_settings: include_settings,
            export_email_tracking_settings: include_settings,
            export_general_settings: include_settings,
            export_isv_config: include_settings,
            export_marketing_settings: include_settings,
            export_outlook_synchronization_settings: include_settings,
            export_relationship_roles: include_settings,
        }
    }

    /// File name the package is saved under
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.solution_name)
    }

    fn validate(&self) -> Result<(), ExportError> {
        let name = &self.solution_name;
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ExportError::InvalidSolutionName(name.clone()));
        }
        Ok(())
    }
}

/// Packaged solution returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSolutionResponse {
    pub export_solution_file: Vec<u8>,
}

impl ExportSolutionResponse {
    /// Decode the base64 package carried on the wire
    pub fn from_base64(encoded: &str) -> Result<Self, ExportError> {
        let export_solution_file = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Ok(Self {
            export_solution_file,
        })
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(rename = "ExportSolutionFile")]
    export_solution_file: String,
}

/// Remote service able to export solutions
pub trait SolutionService {
    /// Whether the connection is established and authenticated
    fn is_ready(&self) -> bool;

    fn export_solution(
        &self,
        request: &ExportSolutionRequest,
    ) -> Result<ExportSolutionResponse, ExportError>;
}

/// [`SolutionService`] over the CRM Web API
#[derive(Debug)]
pub struct WebApiService {
    connection: ConnectionString,
    client: reqwest::blocking::Client,
}

impl WebApiService {
    pub fn connect(connection: ConnectionString) -> Result<Self, ExportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(connection.timeout)
            .build()?;
        tracing::debug!(endpoint = %connection.api_base(), "CRM client created");
        Ok(Self { connection, client })
    }

    /// Endpoint URL for a Web API function or action
    pub fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.connection.api_base(), operation)
    }

    fn request(&self, method: reqwest::Method, operation: &str) -> reqwest::blocking::RequestBuilder {
        let builder = self
            .client
            .request(method, self.endpoint(operation))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");
        match &self.connection.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl SolutionService for WebApiService {
    fn is_ready(&self) -> bool {
        match self.request(reqwest::Method::GET, "WhoAmI").send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "WhoAmI rejected");
                false
            }
            Err(e) => {
                tracing::warn!("WhoAmI failed: {}", e);
                false
            }
        }
    }

    fn export_solution(
        &self,
        request: &ExportSolutionRequest,
    ) -> Result<ExportSolutionResponse, ExportError> {
        let response = self
            .request(reqwest::Method::POST, "ExportSolution")
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireResponse = response.json()?;
        ExportSolutionResponse::from_base64(&wire.export_solution_file)
    }
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Where the package was written
    pub path: PathBuf,
    pub bytes_written: usize,
}

/// Export `request.solution_name` through `service` and save it in `folder`
///
/// The package is written to `{folder}/{SolutionName}.zip`, replacing any
/// existing file. Bytes go to a temporary file in `folder` first and are
/// renamed into place, so a failed write never leaves a truncated package.
pub fn export_to_folder<S>(
    service: &S,
    request: &ExportSolutionRequest,
    folder: &Path,
) -> Result<ExportOutcome, ExportError>
where
    S: SolutionService + ?Sized,
{
    request.validate()?;
    if !service.is_ready() {
        return Err(ExportError::NotReady);
    }

    tracing::info!(
        solution = %request.solution_name,
        managed = request.managed,
        "exporting solution"
    );
    let response = service.export_solution(request)?;

    let path = folder.join(request.file_name());
    write_atomically(folder, &path, &response.export_solution_file)?;
    let bytes_written = response.export_solution_file.len();
    tracing::info!(path = %path.display(), bytes = bytes_written, "solution package written");

    Ok(ExportOutcome {
        path,
        bytes_written,
    })
}

fn write_atomically(folder: &Path, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut staged = tempfile::Builder::new()
        .prefix(".export-")
        .suffix(".partial")
        .tempfile_in(folder)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
