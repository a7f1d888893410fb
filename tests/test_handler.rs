mod common;

use common::{RawResponse, TempDir, sample_site};
use static_gzip_server::audit::AuditLogger;
use static_gzip_server::config::{LimitsConfig, SiteConfig};
use static_gzip_server::http::response::StatusCode;
use static_gzip_server::http::writer::ResponseWriter;
use static_gzip_server::server::RequestHandler;
use static_gzip_server::site::{ResolvedResource, SiteRoot};
use std::sync::Arc;
use std::time::Duration;

fn handler(site: &TempDir, logs: &TempDir) -> RequestHandler {
    let root = SiteRoot::new(site.path().canonicalize().unwrap(), &SiteConfig::default());
    let audit = Arc::new(AuditLogger::new(logs.path()));
    RequestHandler::new(root, audit, LimitsConfig::default())
}

#[tokio::test]
async fn test_serve_resource_streams_gzip() {
    let site = sample_site();
    let logs = TempDir::new("handler-ok");
    let handler = handler(&site, &logs);
    let resolved = handler.site().resolve("/").await.unwrap();

    let mut out = Vec::new();
    let mut writer = ResponseWriter::new(&mut out, Duration::from_secs(1));
    let outcome = handler.serve_resource(&resolved, &mut writer).await.unwrap();

    assert_eq!(outcome.status, StatusCode::Ok);
    assert_eq!(outcome.bytes, 2);
    let resp = RawResponse::parse(&out);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Encoding"), Some("gzip"));
    assert_eq!(resp.decoded_body(), b"hi");
}

#[tokio::test]
async fn test_file_deleted_after_resolution_gives_500() {
    let site = sample_site();
    site.write("gone.css", "body {}");
    let logs = TempDir::new("handler-gone");
    let handler = handler(&site, &logs);

    let resolved = handler.site().resolve("/gone.css").await.unwrap();
    assert_eq!(resolved.status, StatusCode::Ok);
    std::fs::remove_file(&resolved.path).unwrap();

    let mut out = Vec::new();
    let mut writer = ResponseWriter::new(&mut out, Duration::from_secs(1));
    let outcome = handler.serve_resource(&resolved, &mut writer).await.unwrap();

    assert_eq!(outcome.status, StatusCode::InternalServerError);
    assert_eq!(outcome.bytes, 0);
    let resp = RawResponse::parse(&out);
    assert_eq!(resp.status, 500);
    assert_eq!(resp.header("Content-Encoding"), None);
    assert_eq!(resp.body, b"500 Internal Server Error".to_vec());

    let raw = String::from_utf8_lossy(&out);
    assert!(!raw.contains("gone.css"));
    assert!(!raw.contains(&*site.path().to_string_lossy()));
}

#[tokio::test]
async fn test_missing_path_gives_generic_500() {
    let site = sample_site();
    let logs = TempDir::new("handler-missing");
    let handler = handler(&site, &logs);
    let resolved = ResolvedResource {
        path: site.path().join("never-existed.html"),
        status: StatusCode::Ok,
    };

    let mut out = Vec::new();
    let mut writer = ResponseWriter::new(&mut out, Duration::from_secs(1));
    let outcome = handler.serve_resource(&resolved, &mut writer).await.unwrap();

    assert_eq!(outcome.status, StatusCode::InternalServerError);
    let resp = RawResponse::parse(&out);
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, b"500 Internal Server Error".to_vec());
    assert!(!String::from_utf8_lossy(&out).contains("never-existed"));
}
