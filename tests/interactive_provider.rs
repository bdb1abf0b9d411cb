use httpmock::prelude::*;
use pxier_fetcher::config::IhuanConfig;
use pxier_fetcher::proxy::{DialType, IhuanProvider, Provider, ProviderKind, SessionState};
use std::io::Write;

const KEY: &str = "0123456789abcdefghijklmnopqrstuv";

fn brotli(body: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
        writer.write_all(body).unwrap();
    }
    compressed
}

fn provider_for(server: &MockServer) -> IhuanProvider {
    IhuanProvider::from_config(&IhuanConfig {
        http_url: Some(server.url("/tqdl.html")),
        statistics_url: Some(server.url("/ti.html")),
        key_url: Some(server.url("/mouse.do")),
        timeout: Some(2),
        each_fetch_num: Some(20),
        zone: Some("US".to_string()),
        proxy: None,
    })
    .unwrap()
}

#[tokio::test]
async fn test_missing_cookie_leaves_no_session() {
    let server = MockServer::start_async().await;
    let statistics = server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(200).body("<html></html>");
        })
        .await;
    let key = server
        .mock_async(|when, then| {
            when.method(GET).path("/mouse.do");
            then.status(200).body(KEY);
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST).path("/tqdl.html");
            then.status(200).body("1.2.3.4:80");
        })
        .await;

    let provider = provider_for(&server);
    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::NoSession);

    statistics.assert_hits_async(1).await;
    key.assert_hits_async(0).await;
    data.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_full_session_flow_and_reuse() {
    let server = MockServer::start_async().await;
    let statistics = server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(200)
                .header("set-cookie", "statistics=abc123; path=/; HttpOnly")
                .body("<html></html>");
        })
        .await;
    let key = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/mouse.do")
                .header("cookie", "statistics=abc123")
                .header("referer", server.url("/ti.html"));
            then.status(200)
                .body(format!("$(\"input[name='key']\").val(\"{KEY}\");"));
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tqdl.html")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("num=20")
                .body_contains("address=US")
                .body_contains(format!("key={KEY}"));
            then.status(200).header("content-encoding", "br").body(brotli(
                b"<div>1.2.3.4:8080<br>5.6.7.8:3128<br>1.2.3.4:8080<br>not.an.ip:1</div>",
            ));
        })
        .await;

    let provider = provider_for(&server);

    let records = provider.fetch().await;
    let addresses: Vec<_> = records.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(addresses, vec!["1.2.3.4:8080", "5.6.7.8:3128", "1.2.3.4:8080"]);
    assert!(records.iter().all(|r| r.dial_type == DialType::Http));
    assert!(records.iter().all(|r| r.provider == ProviderKind::Ihuan));
    assert_eq!(provider.session_state().await, SessionState::Ready);

    let again = provider.fetch().await;
    assert_eq!(again.len(), 3);

    statistics.assert_hits_async(1).await;
    key.assert_hits_async(1).await;
    data.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_missing_key_keeps_cookie() {
    let server = MockServer::start_async().await;
    let statistics = server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(200).header("set-cookie", "statistics=abc123");
        })
        .await;
    let key = server
        .mock_async(|when, then| {
            when.method(GET).path("/mouse.do");
            then.status(200).body("NO KEY HERE");
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST).path("/tqdl.html");
            then.status(200).body("1.2.3.4:80");
        })
        .await;

    let provider = provider_for(&server);

    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::HasCookie);

    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::HasCookie);

    statistics.assert_hits_async(1).await;
    key.assert_hits_async(2).await;
    data.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_key_error_status_keeps_cookie() {
    let server = MockServer::start_async().await;
    let statistics = server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(200).header("set-cookie", "statistics=abc123");
        })
        .await;
    let key = server
        .mock_async(|when, then| {
            when.method(GET).path("/mouse.do");
            then.status(500).body(KEY);
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST).path("/tqdl.html");
            then.status(200).body("1.2.3.4:80");
        })
        .await;

    let provider = provider_for(&server);
    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::HasCookie);

    statistics.assert_hits_async(1).await;
    key.assert_hits_async(1).await;
    data.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_statistics_error_status_aborts() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(503).header("set-cookie", "statistics=abc123");
        })
        .await;

    let provider = provider_for(&server);
    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::NoSession);
}

#[tokio::test]
async fn test_page_without_addresses_keeps_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ti.html");
            then.status(200).header("set-cookie", "statistics=abc123");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/mouse.do");
            then.status(200).body(KEY);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tqdl.html");
            then.status(200).body("<html>no proxies today</html>");
        })
        .await;

    let provider = provider_for(&server);
    assert!(provider.fetch().await.is_empty());
    assert_eq!(provider.session_state().await, SessionState::Ready);
}
