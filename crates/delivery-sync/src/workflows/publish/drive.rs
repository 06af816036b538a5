use std::fmt::Debug;

use async_trait::async_trait;
use google_drive3::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_drive3::yup_oauth2;
use google_drive3::{api::File, api::Scope, DriveHub};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::config::DriveConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub file_id: String,
    pub name: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveOperationError {
    #[error("drive operation failed: {0}")]
    Backend(String),
    #[error("drive authorization failed: {0}")]
    Auth(String),
}

/// Storage operations the publisher needs from Drive.
#[async_trait]
pub trait DriveGateway: Debug + Send + Sync {
    /// Replaces the content of an existing file, keeping its id and setting
    /// its display name.
    async fn update_file_content(
        &self,
        file_id: &str,
        name: &str,
        content: std::fs::File,
        mime_type: mime::Mime,
    ) -> Result<DriveFile, DriveOperationError>;
}

/// Thin wrapper around the generated google-drive3 client.
pub struct GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
}

impl<C> GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>) -> Self {
        Self { hub }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> DriveOperationError {
        DriveOperationError::Backend(err.to_string())
    }
}

/// Builds a Drive client authorised through the installed-app flow. The
/// first run prompts on the local redirect port; later runs reuse the
/// cached token.
pub async fn connect_drive(
    config: &DriveConfig,
) -> Result<GoogleDriveClient<HttpsConnector<HttpConnector>>, DriveOperationError> {
    let secret = yup_oauth2::read_application_secret(&config.client_secret_file)
        .await
        .map_err(|err| {
            DriveOperationError::Auth(format!("{}: {err}", config.client_secret_file.display()))
        })?;

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPPortRedirect(config.redirect_port),
    )
    .persist_tokens_to_disk(config.token_cache.clone())
    .build()
    .await
    .map_err(|err| DriveOperationError::Auth(err.to_string()))?;

    let connector = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| DriveOperationError::Backend(err.to_string()))?
        .https_or_http()
        .enable_http1()
        .build();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    debug!(token_cache = %config.token_cache.display(), "drive client ready");
    Ok(GoogleDriveClient::new(DriveHub::new(client, auth)))
}

impl<C> std::fmt::Debug for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> DriveGateway for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    async fn update_file_content(
        &self,
        file_id: &str,
        name: &str,
        content: std::fs::File,
        mime_type: mime::Mime,
    ) -> Result<DriveFile, DriveOperationError> {
        let metadata = File {
            name: Some(name.to_string()),
            ..File::default()
        };

        let (_, file) = self
            .hub
            .files()
            .update(metadata, file_id)
            .param("fields", "id,name,mimeType")
            .supports_all_drives(true)
            .add_scope(Scope::Full)
            .upload(content, mime_type)
            .await
            .map_err(GoogleDriveClient::<C>::map_error)?;

        Ok(DriveFile {
            file_id: file.id.unwrap_or_else(|| file_id.to_string()),
            name: file.name.unwrap_or_else(|| name.to_string()),
            mime_type: file.mime_type,
        })
    }
}
