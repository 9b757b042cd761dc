//! Scheme resolution
//!
//! Determines on which scheme a host answers, whether its certificate is
//! valid and what the final URL is, by probing it with HEAD requests.

use crate::crawler::fetcher::FetchError;
use crate::crawler::session::HttpSession;
use crate::url::{add_scheme_to_url, strip_url_scheme, Scheme};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::fmt;
use tracing::{debug, info};

/// Outcome of resolving a target
///
/// `url` and `status_code` stay unset when no probe got an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// Final URL of the last answered probe (or the URL built from a known scheme)
    pub url: Option<String>,
    pub scheme: Option<Scheme>,
    /// False once a probe failed on the certificate
    pub ssl_valid: bool,
    /// Verification mode of the last probe
    pub verify: bool,
    pub status_code: Option<u16>,
    /// True once a probe failed for another reason than TLS
    pub connection_error: bool,
}

impl ResolvedUrl {
    fn unresolved() -> Self {
        Self {
            url: None,
            scheme: None,
            ssl_valid: true,
            verify: true,
            status_code: None,
            connection_error: false,
        }
    }

    /// Whether the target answered 200 on a known URL
    pub fn is_reachable(&self) -> bool {
        self.url.is_some() && self.status_code == Some(200)
    }
}

impl fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.url.as_deref().unwrap_or("None");
        let ssl = match self.url {
            Some(_) => (self.scheme == Some(Scheme::Https)).to_string(),
            None => "None".to_string(),
        };
        let status = self
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "None".to_string());

        writeln!(f, "{:20}: {}", "URL", url)?;
        writeln!(f, "{:20}: {}", "SSL", ssl)?;
        writeln!(f, "{:20}: {}", "status_code", status)?;
        writeln!(f, "{:20}: {}", "connection error", self.connection_error)
    }
}

/// Resolves the scheme of `target` (a host or URL)
///
/// With a `known` scheme and certificate flag nothing is probed unless
/// `validate` is set; the target is then assumed to answer 200. Otherwise the
/// attempts are, in order:
///
/// 1. `https` with certificate verification
/// 2. `https` without verification, only after a TLS failure of (1)
/// 3. `http`
///
/// The first attempt answering 200 wins. Failures are never returned as
/// errors; they leave the result unresolved.
pub async fn resolve_scheme(
    session: &HttpSession,
    target: &str,
    known: Option<(Scheme, bool)>,
    validate: bool,
) -> ResolvedUrl {
    let clean_url = strip_url_scheme(target);

    if let Some((scheme, ssl_valid)) = known {
        let mut resolved = ResolvedUrl {
            url: Some(add_scheme_to_url(&clean_url, scheme)),
            scheme: Some(scheme),
            ssl_valid,
            verify: ssl_valid,
            status_code: None,
            connection_error: false,
        };

        if validate {
            // failures keep the URL built from the known scheme
            let _ = probe(session, &clean_url, scheme, ssl_valid, &mut resolved).await;
        } else {
            resolved.status_code = Some(200);
        }
        debug!("Using known scheme for {}: {:?}", target, resolved.url);
        return resolved;
    }

    let mut resolved = ResolvedUrl::unresolved();

    match probe(session, &clean_url, Scheme::Https, true, &mut resolved).await {
        Ok(true) => return resolved,
        Err(e) if e.is_tls() => {
            if let Ok(true) = probe(session, &clean_url, Scheme::Https, false, &mut resolved).await
            {
                return resolved;
            }
        }
        _ => {}
    }

    if let Ok(false) | Err(_) = probe(session, &clean_url, Scheme::Http, true, &mut resolved).await
    {
        info!("Could not resolve a working scheme for {}", target);
    }

    resolved
}

/// Sends one HEAD probe and records its outcome
///
/// Returns `Ok(true)` for a 200 answer and `Ok(false)` for any other status.
async fn probe(
    session: &HttpSession,
    clean_url: &str,
    scheme: Scheme,
    verify: bool,
    resolved: &mut ResolvedUrl,
) -> Result<bool, FetchError> {
    let full_url = add_scheme_to_url(clean_url, scheme);
    resolved.verify = verify;

    debug!("Requesting {} with verify={}", full_url, verify);
    let response = session
        .send_with_retry(
            Method::HEAD,
            &full_url,
            verify,
            &HeaderMap::new(),
            Some(session.probe_timeout()),
        )
        .await;

    match response {
        Ok(response) => {
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            debug!("Got {} from {} ({})", status, full_url, final_url);

            resolved.scheme = Scheme::of_url(&final_url);
            resolved.url = Some(final_url);
            resolved.status_code = Some(status);
            Ok(status == 200)
        }
        Err(e) => {
            if e.is_tls() {
                resolved.ssl_valid = false;
            } else {
                resolved.connection_error = true;
            }
            debug!("Failed request {}: {}", full_url, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_rustls::rustls::{Certificate, PrivateKey, ServerConfig};
    use tokio_rustls::TlsAcceptor;

    const CERT_PEM: &str = include_str!("../../tests/fixtures/self_signed_cert.pem");
    const KEY_PEM: &str = include_str!("../../tests/fixtures/self_signed_key.pem");

    fn session() -> HttpSession {
        HttpSession::new(&HttpConfig::default(), Duration::from_secs(1)).unwrap()
    }

    fn no_retry_session() -> HttpSession {
        let config = HttpConfig {
            retries: 0,
            probe_timeout: 2.0,
            ..HttpConfig::default()
        };
        HttpSession::new(&config, Duration::from_secs(2)).unwrap()
    }

    /// HTTPS server with a self-signed certificate that answers 200 to anything
    ///
    /// Records the outcome of every TLS handshake.
    async fn start_self_signed_server() -> (SocketAddr, Arc<Mutex<Vec<bool>>>) {
        let certs = rustls_pemfile::certs(&mut CERT_PEM.as_bytes())
            .unwrap()
            .into_iter()
            .map(Certificate)
            .collect();
        let key = rustls_pemfile::pkcs8_private_keys(&mut KEY_PEM.as_bytes())
            .unwrap()
            .remove(0);
        let config = ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(certs, PrivateKey(key))
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&handshakes);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    match acceptor.accept(stream).await {
                        Ok(mut tls) => {
                            log.lock().unwrap().push(true);
                            let mut buf = [0u8; 4096];
                            let _ = tls.read(&mut buf).await;
                            let _ = tls
                                .write_all(
                                    b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                                )
                                .await;
                            let _ = tls.shutdown().await;
                        }
                        Err(_) => log.lock().unwrap().push(false),
                    }
                });
            }
        });

        (addr, handshakes)
    }

    /// Waits until the server saw `count` handshakes
    async fn wait_for_handshakes(handshakes: &Mutex<Vec<bool>>, count: usize) -> Vec<bool> {
        for _ in 0..50 {
            let seen = handshakes.lock().unwrap().clone();
            if seen.len() >= count {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handshakes.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_invalid_certificate_falls_back_to_unverified_https() {
        let (addr, handshakes) = start_self_signed_server().await;
        let target = format!("127.0.0.1:{}", addr.port());

        let resolved = resolve_scheme(&no_retry_session(), &target, None, true).await;

        assert_eq!(
            resolved.url.as_deref(),
            Some(format!("https://127.0.0.1:{}/", addr.port()).as_str())
        );
        assert_eq!(resolved.scheme, Some(Scheme::Https));
        assert_eq!(resolved.status_code, Some(200));
        assert!(!resolved.ssl_valid);
        assert!(!resolved.verify);
        assert!(!resolved.connection_error);
        assert!(resolved.is_reachable());

        // one rejected verified handshake, one unverified; http is never tried
        let mut seen = wait_for_handshakes(&handshakes, 2).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handshakes.lock().unwrap().len(), 2);
        seen.sort();
        assert_eq!(seen, vec![false, true]);
    }

    #[tokio::test]
    async fn test_known_scheme_with_validation_requests_once() {
        let (addr, handshakes) = start_self_signed_server().await;
        let target = format!("127.0.0.1:{}", addr.port());

        let resolved = resolve_scheme(
            &no_retry_session(),
            &target,
            Some((Scheme::Https, false)),
            true,
        )
        .await;

        assert_eq!(resolved.status_code, Some(200));
        assert!(!resolved.verify);
        assert_eq!(wait_for_handshakes(&handshakes, 1).await, vec![true]);
    }


    #[tokio::test]
    async fn test_known_scheme_skips_probing() {
        let resolved = resolve_scheme(
            &session(),
            "www.example.test",
            Some((Scheme::Https, true)),
            false,
        )
        .await;

        assert_eq!(resolved.url.as_deref(), Some("https://www.example.test/"));
        assert_eq!(resolved.scheme, Some(Scheme::Https));
        assert_eq!(resolved.status_code, Some(200));
        assert!(resolved.ssl_valid);
        assert!(resolved.is_reachable());
    }

    #[tokio::test]
    async fn test_known_scheme_replaces_given_scheme() {
        let resolved = resolve_scheme(
            &session(),
            "https://www.example.test/",
            Some((Scheme::Http, false)),
            false,
        )
        .await;

        assert_eq!(resolved.url.as_deref(), Some("http://www.example.test/"));
        assert!(!resolved.ssl_valid);
        assert!(!resolved.verify);
    }

    #[test]
    fn test_display() {
        let resolved = ResolvedUrl {
            url: Some("https://example.test/".to_string()),
            scheme: Some(Scheme::Https),
            ssl_valid: true,
            verify: true,
            status_code: Some(200),
            connection_error: false,
        };

        let rendered = resolved.to_string();
        assert!(rendered.contains("URL                 : https://example.test/"));
        assert!(rendered.contains("SSL                 : true"));
        assert!(rendered.contains("status_code         : 200"));
        assert!(rendered.contains("connection error    : false"));
    }

    #[test]
    fn test_display_unresolved() {
        let rendered = ResolvedUrl::unresolved().to_string();
        assert!(rendered.contains("URL                 : None"));
        assert!(rendered.contains("status_code         : None"));
        assert!(!ResolvedUrl::unresolved().is_reachable());
    }
}
