use crate::backup::driver::StorageBackend;
use crate::backup::logger::{log_with, Level, SharedLogger};
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;

use bon::Builder;
use getset::Getters;
use serde::{Deserialize, Serialize};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpResult, FtpStream, Status};
use validator::Validate;

use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_FTP_PORT: u16 = 21;

fn default_port() -> u16 {
    DEFAULT_FTP_PORT
}

/// Connection settings of an FTP target
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct FtpConfig {
    #[validate(length(min = 1))]
    #[builder(into)]
    host: String,
    #[serde(default = "default_port")]
    #[builder(default = DEFAULT_FTP_PORT)]
    port: u16,
    #[builder(into)]
    login: String,
    #[builder(into)]
    password: RedactedString,
}

/// What the FTP backend needs from a client.
///
/// Every transfer call happens between `connect` and `close`.
pub trait FtpClient: Debug {
    /// Logger for connection events, ignored by default.
    fn set_logger(&mut self, _logger: SharedLogger) {}

    /// Opens and authenticates the session.
    fn connect(&mut self) -> Result<()>;

    /// Ends the session, a no-op when not connected.
    fn close(&mut self) -> Result<()>;

    /// Uploads the local file `local` as `remote_name`, replacing it if present.
    fn upload(&mut self, local: &Path, remote_name: &str) -> Result<()>;

    fn delete(&mut self, remote_name: &str) -> Result<()>;

    /// Names in the working directory.
    fn list_files(&mut self) -> Result<Vec<String>>;

    /// `false` only when the server reports the file as unavailable, other
    /// failures are errors.
    fn is_file(&mut self, remote_name: &str) -> Result<bool>;
}

/// [`FtpClient`] over a blocking `suppaftp` stream, binary transfers only.
pub struct SuppaFtpClient {
    config: FtpConfig,
    stream: Option<FtpStream>,
    logger: Option<SharedLogger>,
}

impl Debug for SuppaFtpClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppaFtpClient")
            .field("config", &self.config)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl SuppaFtpClient {
    pub fn new(config: FtpConfig) -> Self {
        Self {
            config,
            stream: None,
            logger: None,
        }
    }

    fn stream(&mut self) -> Result<&mut FtpStream> {
        self.stream.as_mut().ok_or_else(|| {
            Error::from(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "FTP client is not connected",
            ))
        })
    }

    fn log(&self, msg: &str) {
        log_with(&self.logger, "FtpClient", Level::Info, msg);
    }
}

impl FtpClient for SuppaFtpClient {
    fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = Some(logger);
    }

    fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let mut stream = FtpStream::connect((self.config.host.as_str(), self.config.port))
            .map_err(Error::from)
            .with_msg(format!("Connecting to {address} failed"))?;
        stream
            .login(self.config.login.as_str(), self.config.password.inner().as_str())
            .map_err(Error::from)
            .with_msg(format!("Login as {:?} on {address} failed", self.config.login))?;
        stream.transfer_type(FileType::Binary)?;

        self.stream = Some(stream);
        self.log(&format!("Connected to '{address}'"));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.quit()?;
            self.log(&format!("Disconnected from '{}'", self.config.host));
        }
        Ok(())
    }

    fn upload(&mut self, local: &Path, remote_name: &str) -> Result<()> {
        let mut file = File::open(local)?;
        let bytes = self.stream()?.put_file(remote_name, &mut file)?;
        self.log(&format!("File '{}' uploaded as '{remote_name}'", local.display()));
        tracing::debug!("Uploaded {bytes} bytes to {remote_name:?}");
        Ok(())
    }

    fn delete(&mut self, remote_name: &str) -> Result<()> {
        self.stream()?.rm(remote_name)?;
        self.log(&format!("File '{remote_name}' deleted"));
        Ok(())
    }

    fn list_files(&mut self) -> Result<Vec<String>> {
        Ok(self.stream()?.nlst(None)?)
    }

    fn is_file(&mut self, remote_name: &str) -> Result<bool> {
        presence_from_size(self.stream()?.size(remote_name))
    }
}

/// A `SIZE` answer means the file exists, `550` means it does not.
fn presence_from_size(size: FtpResult<usize>) -> Result<bool> {
    match size {
        Ok(_) => Ok(true),
        Err(FtpError::UnexpectedResponse(response))
            if response.status == Status::FileUnavailable =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Keeps iterations in the working directory of an FTP account.
#[derive(Debug)]
pub struct FtpBackend<C: FtpClient = SuppaFtpClient> {
    client: C,
}

impl FtpBackend<SuppaFtpClient> {
    /// Backend over a real FTP connection, opened on `begin`.
    pub fn new(config: FtpConfig) -> Self {
        Self::with_client(SuppaFtpClient::new(config))
    }
}

impl<C: FtpClient> FtpBackend<C> {
    /// Backend over any [`FtpClient`].
    pub fn with_client(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: FtpClient> StorageBackend for FtpBackend<C> {
    fn begin(&mut self, logger: &Option<SharedLogger>) -> Result<()> {
        if let Some(logger) = logger {
            self.client.set_logger(logger.clone());
        }
        self.client.connect()
    }

    fn end(&mut self) -> Result<()> {
        self.client.close()
    }

    fn save_file(&mut self, local: &Path, remote_name: &str) -> Result<()> {
        self.client.upload(local, remote_name)
    }

    fn delete_file(&mut self, remote_name: &str) -> Result<()> {
        if !self.client.is_file(remote_name)? {
            return Err(Error::NotFound(format!("{remote_name:?} on FTP server")));
        }
        self.client.delete(remote_name)
    }

    fn list_files(&mut self) -> Result<Vec<String>> {
        self.client.list_files()
    }
}
