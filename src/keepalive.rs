//! Self-ping loop that keeps free-tier hosts from idling the process

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

const USER_AGENT: &str = "fitness-funnel-keepalive/1.0";
const PING_TIMEOUT: Duration = Duration::from_secs(30);

pub fn client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(PING_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// One GET; a non-2xx status is still a successful ping.
pub async fn ping(client: &Client, url: &str) -> Result<StatusCode> {
    let start = Instant::now();
    let status = client.get(url).send().await?.status();
    debug!(
        %url,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Keep-alive ping"
    );
    Ok(status)
}

/// Pings `url` every `every` until the runtime shuts down. Failures are logged only.
pub fn spawn_keepalive(url: String, every: Duration) -> Result<JoinHandle<()>> {
    let client = client()?;
    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately; the process was just started anyway
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match ping(&client, &url).await {
                Ok(status) if !status.is_success() => {
                    warn!(%url, status = status.as_u16(), "Keep-alive ping got non-success status");
                }
                Ok(_) => {}
                Err(err) => warn!(%url, "Keep-alive ping failed: {}", err),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn ping_hits_target() {
        let server = MockServer::start_async().await;
        let health_mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).body("OK");
        });

        let status = ping(&client().unwrap(), &server.url("/health"))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        health_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn ping_reports_server_errors_as_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(503);
        });

        let status = ping(&client().unwrap(), &server.url("/health"))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ping_fails_on_unreachable_host() {
        let result = ping(&client().unwrap(), "http://127.0.0.1:1/health").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn loop_keeps_pinging() {
        let server = MockServer::start_async().await;
        let ping_mock = server.mock(|when, then| {
            when.method(GET).path("/ping");
            then.status(200);
        });

        let handle = spawn_keepalive(server.url("/ping"), Duration::from_millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.abort();

        assert!(ping_mock.calls() >= 2);
    }
}
