#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
use anyhow::Result;
use secrecy::SecretString;

mod common;

fn default_collectors() -> Vec<String> {
    vec!["global_status".to_string(), "exporter".to_string()]
}

fn spawn_exporter(port: u16, metrics_path: &str) -> tokio::task::JoinHandle<Result<()>> {
    let dsn = SecretString::from(common::unreachable_dsn());
    let metrics_path = metrics_path.to_string();
    tokio::spawn(async move {
        sphinx_exporter::exporter::new(port, None, metrics_path, dsn, default_collectors()).await
    })
}

#[tokio::test]
async fn test_exporter_starts_and_stops() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/metrics");

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start on port {port}"
    );

    handle.abort();
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let result = tokio::net::TcpStream::connect(format!("127.0.0.1:{port}")).await;
    assert!(result.is_err(), "Server should be stopped");

    Ok(())
}

#[tokio::test]
async fn test_metrics_served_while_searchd_is_down() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/metrics");

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start on port {port}"
    );

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/metrics", common::get_test_url(port)))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body = response.text().await?;
    // The meta metrics are always present, even when every scrape fails.
    assert!(body.contains("sphinx_up 0"), "missing up gauge:\n{body}");
    assert!(body.contains("sphinx_exporter_last_scrape_error 1"));
    assert!(body.contains("sphinx_exporter_last_scrape_duration_seconds"));
    // The startup probe already ran one cycle before this pull.
    assert!(body.contains("sphinx_exporter_scrapes_total 2"));

    // Status families are registered up front, so they expose their zero
    // values; no scrape has ever populated them.
    assert!(body.contains("sphinx_status_uptime 0"));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_scrape_counter_advances_per_pull() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/metrics");

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let url = format!("{}/metrics", common::get_test_url(port));

    let first = client.get(&url).send().await?.text().await?;
    let second = client.get(&url).send().await?.text().await?;

    assert!(first.contains("sphinx_exporter_scrapes_total 2"));
    assert!(second.contains("sphinx_exporter_scrapes_total 3"));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/metrics");

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_landing_page_links_metrics_path() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/metrics");

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let response = client.get(common::get_test_url(port)).send().await?;
    assert_eq!(response.status(), 200);

    let body = response.text().await?;
    assert!(body.contains("Sphinx exporter"));
    assert!(body.contains("/metrics"));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_custom_metrics_path() -> Result<()> {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, "/prom");

    assert!(common::wait_for_server(port, 50).await);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/prom", common::get_test_url(port)))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert!(response.text().await?.contains("sphinx_up"));

    let default_path = client
        .get(format!("{}/metrics", common::get_test_url(port)))
        .send()
        .await?;
    assert_eq!(default_path.status(), 404);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_exporter_bind_to_ipv4_localhost() -> Result<()> {
    let port = common::get_available_port();
    let dsn = SecretString::from(common::unreachable_dsn());

    let handle = tokio::spawn(async move {
        sphinx_exporter::exporter::new(
            port,
            Some("127.0.0.1".to_string()),
            "/metrics".to_string(),
            dsn,
            default_collectors(),
        )
        .await
    });

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start on 127.0.0.1:{port}"
    );

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_exporter_rejects_root_metrics_path() -> Result<()> {
    let dsn = SecretString::from(common::unreachable_dsn());
    let result = sphinx_exporter::exporter::new(
        common::get_available_port(),
        None,
        "/".to_string(),
        dsn,
        default_collectors(),
    )
    .await;

    assert!(result.is_err(), "\"/\" would collide with the landing page");
    Ok(())
}

#[tokio::test]
async fn test_exporter_rejects_invalid_listen_address() -> Result<()> {
    let dsn = SecretString::from(common::unreachable_dsn());
    let result = sphinx_exporter::exporter::new(
        common::get_available_port(),
        Some("not-an-ip".to_string()),
        "/metrics".to_string(),
        dsn,
        default_collectors(),
    )
    .await;

    assert!(result.is_err());
    Ok(())
}
