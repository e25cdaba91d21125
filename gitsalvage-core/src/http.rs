//! Construction of the single, shared HTTP client used for every request the engine makes.
//!
//! The client is the "required collaborator" named by the design: `get(uri) -> (status,
//! body)` with connection pooling, a fixed User-Agent, TLS verification disabled, and an
//! optional proxy dial sourced from the environment.

use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.102 Safari/537.36";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to build the HTTP client")]
        Build(#[from] reqwest::Error),
        #[error("proxy environment variable contained an unparsable URI")]
        ProxyUri(#[source] url::ParseError),
    }
}
pub use error::Error;

/// Picks the proxy to dial through, mirroring the original tool's precedence: `all_proxy`
/// wins over `http_proxy`/`https_proxy`; a `socks5://` scheme routes through the SOCKS
/// proxy support, anything else is treated as a plain HTTP(S) proxy.
///
/// Authenticated proxies are a known gap, same as upstream.
fn proxy_from_env() -> Result<Option<reqwest::Proxy>, Error> {
    let candidate = std::env::var("all_proxy")
        .ok()
        .or_else(|| std::env::var("http_proxy").ok())
        .or_else(|| std::env::var("https_proxy").ok());

    let Some(uri) = candidate else {
        return Ok(None);
    };
    // Validate early so a malformed proxy URI fails fast instead of silently being ignored
    // by reqwest's lazier parsing.
    url::Url::parse(&uri).map_err(Error::ProxyUri)?;
    Ok(Some(reqwest::Proxy::all(uri)?))
}

/// Build the shared blocking client. `max_conns_per_host` should be `N + 250` where `N` is
/// the configured worker parallelism, matching the original tool's connection-pool sizing.
pub fn build_client(max_conns_per_host: usize) -> Result<reqwest::blocking::Client, Error> {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(max_conns_per_host)
        .connect_timeout(CONNECT_TIMEOUT);

    if let Some(proxy) = proxy_from_env()? {
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// The outcome of a single fetch, before acceptability checking.
pub struct Response {
    pub status: reqwest::StatusCode,
    pub body: Vec<u8>,
}

/// Issue a plain `GET`. Transport errors (DNS, connection refused, timeout, …) are
/// returned as `Err`; any HTTP status, including 4xx/5xx, is returned as `Ok` so that
/// callers can apply the 429-specific re-enqueue logic themselves.
pub fn get(client: &reqwest::blocking::Client, uri: &str) -> reqwest::Result<Response> {
    let resp = client.get(uri).send()?;
    let status = resp.status();
    let body = resp.bytes()?.to_vec();
    Ok(Response { status, body })
}
