use chrono::{TimeZone, Utc};
use delivery_sync::config::AdManagerConfig;
use delivery_sync::workflows::delivery::{
    AdManagerCredentials, AdManagerReportClient, AdManagerSession, ReportDownloadOptions,
    ReportError, ReportJobId, ReportJobStatus, ReportQuery, ReportService,
};
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_PATH: &str = "/apis/ads/publisher/v202505/ReportService";

fn client_for(server: &MockServer) -> AdManagerReportClient {
    let config = AdManagerConfig {
        network_code: "12345678".to_string(),
        application_name: "Delivery & Pacing".to_string(),
        api_version: "v202505".to_string(),
        endpoint: format!("{}/", server.uri()),
        credentials: AdManagerCredentials::ServiceAccountKey(PathBuf::from("unused.json")),
    };
    let session = AdManagerSession::new(&config, String::from("test-token"));
    AdManagerReportClient::with_client(session, reqwest::Client::new())
}

fn soap_response(operation: &str, rval: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap:Header><ResponseHeader xmlns="https://www.google.com/apis/ads/publisher/v202505">"#,
            "<requestId>req-1</requestId><responseTime>41</responseTime></ResponseHeader></soap:Header>",
            r#"<soap:Body><{op}Response xmlns="https://www.google.com/apis/ads/publisher/v202505">"#,
            "<rval>{rval}</rval></{op}Response></soap:Body></soap:Envelope>"
        ),
        op = operation,
        rval = rval,
    )
}

#[tokio::test]
async fn run_report_job_sends_header_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_string_contains("<runReportJob"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response(
            "runReportJob",
            "<id>8675309</id><reportJobStatus>IN_PROGRESS</reportJobStatus>",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let now = Utc.with_ymd_and_hms(2024, 11, 3, 15, 0, 0).unwrap();
    let job = client
        .run_report_job(&ReportQuery::delivery(now))
        .await
        .expect("job submitted");
    assert_eq!(job, ReportJobId(8675309));

    let requests = server.received_requests().await.expect("recording enabled");
    let body = String::from_utf8(requests[0].body.clone()).expect("utf-8 body");
    assert!(body.contains("<networkCode>12345678</networkCode>"));
    assert!(body.contains("<applicationName>Delivery &amp; Pacing</applicationName>"));
    assert!(body.contains("<dimensions>AD_UNIT_NAME</dimensions>"));
    assert!(body.contains("<dimensionAttributes>LINE_ITEM_DELIVERY_INDICATOR</dimensionAttributes>"));
    assert!(body.contains("<columns>TOTAL_ACTIVE_VIEW_MEASURABLE_IMPRESSIONS</columns>"));
    assert!(body.contains("<startDate><year>2020</year><month>1</month><day>1</day></startDate>"));
    assert!(body.contains("<endDate><year>2024</year><month>11</month><day>3</day></endDate>"));
    assert!(body.contains("<dateRangeType>CUSTOM_DATE</dateRangeType>"));
}

#[tokio::test]
async fn report_job_status_maps_backend_states() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .and(body_string_contains("<reportJobId>41</reportJobId>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(soap_response("getReportJobStatus", "IN_PROGRESS")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .and(body_string_contains("<reportJobId>42</reportJobId>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(soap_response("getReportJobStatus", "COMPLETED")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.report_job_status(ReportJobId(41)).await.unwrap(),
        ReportJobStatus::InProgress
    );
    assert_eq!(
        client.report_job_status(ReportJobId(42)).await.unwrap(),
        ReportJobStatus::Completed
    );
}

#[tokio::test]
async fn download_fetches_the_signed_url_as_uncompressed_csv() {
    let server = MockServer::start().await;
    let download_url = format!("{}/download/report.csv?id=42&amp;sig=abc", server.uri());
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .and(body_string_contains("<getReportDownloadUrlWithOptions"))
        .and(body_string_contains("<exportFormat>CSV_DUMP</exportFormat>"))
        .and(body_string_contains("<useGzipCompression>false</useGzipCompression>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response(
            "getReportDownloadUrlWithOptions",
            &download_url,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/report.csv"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Dimension.DATE\n2024-11-03\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let bytes = client
        .download_report(ReportJobId(42), &ReportDownloadOptions::csv_dump())
        .await
        .expect("report downloaded");

    assert_eq!(bytes, b"Dimension.DATE\n2024-11-03\n");
}

#[tokio::test]
async fn soap_fault_is_surfaced_with_its_message() {
    let server = MockServer::start().await;
    let fault = concat!(
        r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>"#,
        "<soap:Fault><faultcode>soap:Server</faultcode>",
        "<faultstring>[ReportError.COLUMNS_NOT_SUPPORTED_FOR_REQUESTED_DIMENSIONS]</faultstring>",
        "</soap:Fault></soap:Body></soap:Envelope>"
    );
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string(fault))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .run_report_job(&ReportQuery::delivery(Utc::now()))
        .await
        .expect_err("fault surfaces");

    match &err {
        ReportError::Fault(message) => {
            assert!(message.contains("COLUMNS_NOT_SUPPORTED_FOR_REQUESTED_DIMENSIONS"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), "fault");
}

#[tokio::test]
async fn unknown_status_is_a_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(soap_response("getReportJobStatus", "PAUSED")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .report_job_status(ReportJobId(7))
        .await
        .expect_err("status rejected");
    assert_eq!(err.kind(), "response");
}
