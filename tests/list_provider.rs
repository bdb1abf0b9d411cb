use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use httpmock::prelude::*;
use pxier_fetcher::config::{DualListConfig, SingleListConfig};
use pxier_fetcher::proxy::{DialType, ListProvider, Provider, ProviderKind};
use std::io::Write;
use std::time::Duration;

fn gzip(body: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

fn deflate(body: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

fn brotli(body: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
        writer.write_all(body).unwrap();
    }
    compressed
}

fn addresses(records: &[pxier_fetcher::ProxyRecord]) -> Vec<&str> {
    records.iter().map(|r| r.address.as_str()).collect()
}

#[tokio::test]
async fn test_gzip_list_yields_one_record_per_line() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/proxy-list-raw.txt")
                .header("accept-encoding", "gzip");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(gzip(b"1.2.3.4:8080\n5.6.7.8:1080\n\n"));
        })
        .await;

    let provider = ListProvider::clarketm(&SingleListConfig {
        url: Some(server.url("/proxy-list-raw.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    mock.assert_hits_async(1).await;
    assert_eq!(addresses(&records), vec!["1.2.3.4:8080", "5.6.7.8:1080"]);
    assert!(records.iter().all(|r| r.dial_type == DialType::Http));
    assert!(records.iter().all(|r| r.provider == ProviderKind::Cpl));
    assert!(records.iter().all(|r| r.error_count == 0));
}

#[tokio::test]
async fn test_brotli_list_is_decoded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/list.txt");
            then.status(200)
                .header("content-encoding", "br")
                .body(brotli(b"10.0.0.1:3128
10.0.0.2:8080
"));
        })
        .await;

    let provider = ListProvider::clarketm(&SingleListConfig {
        url: Some(server.url("/list.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    assert_eq!(addresses(&records), vec!["10.0.0.1:3128", "10.0.0.2:8080"]);
}

#[tokio::test]
async fn test_deflate_list_is_decoded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/socks5.txt");
            then.status(200)
                .header("content-encoding", "deflate")
                .body(deflate(b"5.6.7.8:1080
9.9.9.9:9050
"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/http.txt");
            then.status(200).body("");
        })
        .await;

    let provider = ListProvider::speedx(&DualListConfig {
        http_url: Some(server.url("/http.txt")),
        socks5_url: Some(server.url("/socks5.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    assert_eq!(addresses(&records), vec!["5.6.7.8:1080", "9.9.9.9:9050"]);
    assert!(records.iter().all(|r| r.dial_type == DialType::Socks5));
}

#[tokio::test]
async fn test_dual_list_concatenates_both_transports() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/http.txt");
            then.status(200).body("1.1.1.1:80\n2.2.2.2:8080\n");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/socks5.txt");
            then.status(200).body("3.3.3.3:1080\n");
        })
        .await;

    let provider = ListProvider::speedx(&DualListConfig {
        http_url: Some(server.url("/http.txt")),
        socks5_url: Some(server.url("/socks5.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    assert_eq!(addresses(&records), vec!["1.1.1.1:80", "2.2.2.2:8080", "3.3.3.3:1080"]);
    let dial_types: Vec<_> = records.iter().map(|r| r.dial_type).collect();
    assert_eq!(dial_types, vec![DialType::Http, DialType::Http, DialType::Socks5]);
    assert!(records.iter().all(|r| r.provider == ProviderKind::Tsx));
}

#[tokio::test]
async fn test_one_failing_source_keeps_the_other() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/http.txt");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/socks5.txt");
            then.status(200).body("5.6.7.8:1080\n9.9.9.9:9050\n");
        })
        .await;

    let provider = ListProvider::shiftytr(&DualListConfig {
        http_url: Some(server.url("/http.txt")),
        socks5_url: Some(server.url("/socks5.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    assert_eq!(addresses(&records), vec!["5.6.7.8:1080", "9.9.9.9:9050"]);
    assert!(records.iter().all(|r| r.dial_type == DialType::Socks5));
}

#[tokio::test]
async fn test_connection_error_on_one_source() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/http.txt");
            then.status(200).body("1.2.3.4:3128\n");
        })
        .await;

    let provider = ListProvider::shiftytr(&DualListConfig {
        http_url: Some(server.url("/http.txt")),
        socks5_url: Some("http://127.0.0.1:1/socks5.txt".to_string()),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    let records = provider.fetch().await;
    assert_eq!(addresses(&records), vec!["1.2.3.4:3128"]);
}

#[tokio::test]
async fn test_timeout_degrades_to_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow.txt");
            then.status(200)
                .delay(Duration::from_secs(3))
                .body("1.2.3.4:80\n");
        })
        .await;

    let provider = ListProvider::clarketm(&SingleListConfig {
        url: Some(server.url("/slow.txt")),
        timeout: Some(1),
        proxy: None,
    })
    .unwrap();

    assert!(provider.fetch().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_gzip_degrades_to_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken.txt");
            then.status(200)
                .header("content-encoding", "gzip")
                .body("1.2.3.4:80 is not gzip");
        })
        .await;

    let provider = ListProvider::clarketm(&SingleListConfig {
        url: Some(server.url("/broken.txt")),
        timeout: Some(2),
        proxy: None,
    })
    .unwrap();

    assert!(provider.fetch().await.is_empty());
}
