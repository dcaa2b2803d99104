use std::time::Duration;

/// Build an HTTP client for one model service.
///
/// `timeout` bounds a whole request including the body; pass `None` for
/// streaming clients whose body may legitimately take minutes. Idle pooled
/// connections are not kept, so every attempt dials a new connection.
pub fn build_http_client(
    timeout: Option<Duration>,
    connect_timeout: Duration,
) -> Result<reqwest::Client, String> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(0)
        .tcp_nodelay(true);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(|e| format!("Failed to build HTTP client: {}", e))
}
