//! External server-control and certificate-issuance commands.

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Signals the proxy server to pick up configuration changes.
#[async_trait]
pub trait ServerControl: Send + Sync {
    async fn reload(&self) -> Result<(), CommandError>;
}

/// Obtains a certificate for a domain and wires it into the site file.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, domain: &str, contact_email: &str) -> Result<(), CommandError>;
}

/// Controls the server through its own binary.
#[derive(Debug, Clone)]
pub struct NginxControl {
    binary: String,
}

impl NginxControl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Ask the server to check its configuration without applying it.
    pub async fn test_config(&self) -> Result<(), CommandError> {
        run_command(&self.binary, &["-t"]).await.map(|_| ())
    }
}

#[async_trait]
impl ServerControl for NginxControl {
    async fn reload(&self) -> Result<(), CommandError> {
        run_command(&self.binary, &["-s", "reload"]).await?;
        tracing::info!(binary = %self.binary, "Server reloaded");
        Ok(())
    }
}

/// Issues certificates with certbot's nginx plugin.
#[derive(Debug, Clone)]
pub struct CertbotIssuer {
    binary: String,
}

impl CertbotIssuer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl CertificateIssuer for CertbotIssuer {
    async fn issue(&self, domain: &str, contact_email: &str) -> Result<(), CommandError> {
        run_command(
            &self.binary,
            &[
                "--nginx",
                "-d",
                domain,
                "--email",
                contact_email,
                "--agree-tos",
                "--non-interactive",
            ],
        )
        .await?;
        tracing::info!(domain, "Certificate issued");
        Ok(())
    }
}

/// Run `program` with `args` (no shell) and return its stdout.
pub async fn run_command(program: &str, args: &[&str]) -> Result<String, CommandError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
