use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use google_drive3::common::GetToken;
use google_drive3::yup_oauth2;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::query::ReportQuery;
use super::service::{
    ReportDownloadOptions, ReportError, ReportJobId, ReportJobStatus, ReportService,
};
use crate::config::AdManagerConfig;

/// OAuth scope required by every Ad Manager API call.
pub const AD_MANAGER_SCOPE: &str = "https://www.googleapis.com/auth/dfp";

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Offline credentials for the Ad Manager API.
#[derive(Debug, Clone)]
pub enum AdManagerCredentials {
    /// Path to a service-account JSON key.
    ServiceAccountKey(PathBuf),
    /// Installed-app client plus a long-lived refresh token.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

/// Authenticated binding to one Ad Manager network. Created once at startup
/// and shared by every refresh cycle.
pub struct AdManagerSession {
    report_service_url: String,
    namespace: String,
    network_code: String,
    application_name: String,
    auth: Box<dyn GetToken>,
}

impl AdManagerSession {
    pub fn new(config: &AdManagerConfig, auth: impl GetToken + 'static) -> Self {
        let endpoint = config.endpoint.trim_end_matches('/');
        Self {
            report_service_url: format!(
                "{endpoint}/apis/ads/publisher/{}/ReportService",
                config.api_version
            ),
            namespace: format!(
                "https://www.google.com/apis/ads/publisher/{}",
                config.api_version
            ),
            network_code: config.network_code.clone(),
            application_name: config.application_name.clone(),
            auth: Box::new(auth),
        }
    }

    /// Builds the token source described by the configured credentials.
    pub async fn connect(config: &AdManagerConfig) -> Result<Self, ReportError> {
        let session = match &config.credentials {
            AdManagerCredentials::ServiceAccountKey(path) => {
                let key = yup_oauth2::read_service_account_key(path)
                    .await
                    .map_err(|err| ReportError::Auth(format!("{}: {err}", path.display())))?;
                let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(|err| ReportError::Auth(err.to_string()))?;
                Self::new(config, auth)
            }
            AdManagerCredentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let secret = yup_oauth2::authorized_user::AuthorizedUserSecret {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                    key_type: "authorized_user".to_string(),
                };
                let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
                    .build()
                    .await
                    .map_err(|err| ReportError::Auth(err.to_string()))?;
                Self::new(config, auth)
            }
        };

        debug!(
            network_code = %session.network_code,
            endpoint = %session.report_service_url,
            "ad manager session ready"
        );
        Ok(session)
    }

    async fn access_token(&self) -> Result<String, ReportError> {
        self.auth
            .get_token(&[AD_MANAGER_SCOPE])
            .await
            .map_err(|err| ReportError::Auth(err.to_string()))?
            .ok_or_else(|| ReportError::Auth("no access token issued".to_string()))
    }

    fn envelope(&self, body: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<soapenv:Envelope xmlns:soapenv="{envelope_ns}">"#,
                r#"<soapenv:Header><RequestHeader xmlns="{ns}">"#,
                "<networkCode>{network}</networkCode>",
                "<applicationName>{application}</applicationName>",
                "</RequestHeader></soapenv:Header>",
                "<soapenv:Body>{body}</soapenv:Body>",
                "</soapenv:Envelope>"
            ),
            envelope_ns = SOAP_ENVELOPE_NS,
            ns = self.namespace,
            network = escape(self.network_code.as_str()),
            application = escape(self.application_name.as_str()),
            body = body,
        )
    }
}

impl std::fmt::Debug for AdManagerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdManagerSession")
            .field("report_service_url", &self.report_service_url)
            .field("network_code", &self.network_code)
            .finish_non_exhaustive()
    }
}

/// `ReportService` over the Ad Manager SOAP API.
#[derive(Debug)]
pub struct AdManagerReportClient {
    session: AdManagerSession,
    http: reqwest::Client,
}

impl AdManagerReportClient {
    pub fn new(session: AdManagerSession) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .user_agent(session.application_name.clone())
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(session, http))
    }

    pub fn with_client(session: AdManagerSession, http: reqwest::Client) -> Self {
        Self { session, http }
    }

    async fn call(&self, operation: &str, body: String) -> Result<String, ReportError> {
        let token = self.session.access_token().await?;
        let response = self
            .http
            .post(&self.session.report_service_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(self.session.envelope(&body))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if let Some(fault) = element_text(&text, &["faultstring"])? {
            return Err(ReportError::Fault(fault));
        }
        if !status.is_success() {
            return Err(ReportError::Response(format!("{operation} returned HTTP {status}")));
        }

        Ok(text)
    }

    fn operation(&self, name: &str, inner: &str) -> String {
        format!(
            r#"<{name} xmlns="{ns}">{inner}</{name}>"#,
            ns = self.session.namespace
        )
    }
}

#[async_trait]
impl ReportService for AdManagerReportClient {
    async fn run_report_job(&self, query: &ReportQuery) -> Result<ReportJobId, ReportError> {
        let body = self.operation("runReportJob", &report_job_xml(query));
        let response = self.call("runReportJob", body).await?;
        let id = element_text(&response, &["rval", "id"])?
            .ok_or_else(|| ReportError::Response("runReportJob returned no job id".to_string()))?;

        id.parse::<i64>()
            .map(ReportJobId)
            .map_err(|_| ReportError::Response(format!("invalid report job id '{id}'")))
    }

    async fn report_job_status(&self, job: ReportJobId) -> Result<ReportJobStatus, ReportError> {
        let inner = format!("<reportJobId>{job}</reportJobId>");
        let body = self.operation("getReportJobStatus", &inner);
        let response = self.call("getReportJobStatus", body).await?;
        let status = element_text(&response, &["rval"])?.unwrap_or_default();

        ReportJobStatus::from_api_str(&status)
            .ok_or_else(|| ReportError::Response(format!("unknown report job status '{status}'")))
    }

    async fn download_report(
        &self,
        job: ReportJobId,
        options: &ReportDownloadOptions,
    ) -> Result<Vec<u8>, ReportError> {
        let inner = format!(
            concat!(
                "<reportJobId>{job}</reportJobId>",
                "<reportDownloadOptions>",
                "<exportFormat>{format}</exportFormat>",
                "<useGzipCompression>{gzip}</useGzipCompression>",
                "</reportDownloadOptions>"
            ),
            job = job,
            format = options.export_format.as_api_str(),
            gzip = options.use_gzip_compression,
        );
        let body = self.operation("getReportDownloadUrlWithOptions", &inner);
        let response = self.call("getReportDownloadUrlWithOptions", body).await?;
        let url = element_text(&response, &["rval"])?
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ReportError::Response(format!("no download URL returned for report job {job}"))
            })?;

        debug!(job_id = %job, "downloading report");
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;

        Ok(bytes.to_vec())
    }
}

fn transport(err: reqwest::Error) -> ReportError {
    ReportError::Transport(err.to_string())
}

fn report_job_xml(query: &ReportQuery) -> String {
    let mut xml = String::from("<reportJob><reportQuery>");
    for dimension in &query.dimensions {
        xml.push_str(&format!("<dimensions>{}</dimensions>", dimension.as_api_str()));
    }
    for column in &query.columns {
        xml.push_str(&format!("<columns>{}</columns>", column.as_api_str()));
    }
    for attribute in &query.dimension_attributes {
        xml.push_str(&format!(
            "<dimensionAttributes>{}</dimensionAttributes>",
            attribute.as_api_str()
        ));
    }
    xml.push_str(&date_xml("startDate", query.date_range.start_date()));
    xml.push_str(&date_xml("endDate", query.date_range.end_date()));
    xml.push_str(&format!(
        "<dateRangeType>{}</dateRangeType>",
        query.date_range_type.as_api_str()
    ));
    xml.push_str("</reportQuery></reportJob>");
    xml
}

fn date_xml(tag: &str, date: NaiveDate) -> String {
    format!(
        "<{tag}><year>{}</year><month>{}</month><day>{}</day></{tag}>",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Text of the first element reached by descending through `path` by local
/// name, ignoring namespace prefixes. Each step must sit inside the element
/// matched by the previous one.
fn element_text(xml: &str, path: &[&str]) -> Result<Option<String>, ReportError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    // Depth at which each matched ancestor was opened.
    let mut matched: Vec<usize> = Vec::with_capacity(path.len());

    loop {
        let event = reader.read_event().map_err(malformed)?;
        match event {
            Event::Start(start) => {
                depth += 1;
                if start.local_name().as_ref() != path[matched.len()].as_bytes() {
                    continue;
                }
                if matched.len() + 1 == path.len() {
                    let raw = reader.read_text(start.name()).map_err(malformed)?;
                    let text = unescape(&raw).map_err(malformed)?;
                    return Ok(Some(text.trim().to_string()));
                }
                matched.push(depth);
            }
            Event::End(_) => {
                if matched.last() == Some(&depth) {
                    matched.pop();
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(empty)
                if matched.len() + 1 == path.len()
                    && empty.local_name().as_ref() == path[matched.len()].as_bytes() =>
            {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn malformed<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Response(format!("malformed SOAP response: {err}"))
}
