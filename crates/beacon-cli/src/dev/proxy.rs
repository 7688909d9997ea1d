//! Prefix-based request proxying for backend APIs.
//!
//! Routes come from the `proxy` table of `beacon.config.json`. Matching
//! is a plain prefix test against the request path, in declaration
//! order, first match wins. Matched requests are forwarded to the
//! target origin with the path and query preserved.

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, Response, StatusCode, Uri};
use beacon_config::ConfigFile;

use crate::error::{CliError, Result};

/// One configured proxy mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    /// Request path prefix, e.g. `/api`.
    pub prefix: String,
    /// Target origin, e.g. `http://localhost:8080`.
    pub target: String,
    /// Rewrite the Host header to the target's host.
    pub change_origin: bool,
}

impl ProxyRoute {
    /// Extract routes from a config file, preserving declaration order.
    pub fn from_config(config: &ConfigFile) -> Vec<ProxyRoute> {
        config
            .proxy
            .iter()
            .map(|(prefix, target)| ProxyRoute {
                prefix: prefix.clone(),
                target: target.target.trim_end_matches('/').to_string(),
                change_origin: target.change_origin,
            })
            .collect()
    }

    /// First route whose prefix matches the request path.
    pub fn match_route<'a>(routes: &'a [ProxyRoute], path: &str) -> Option<&'a ProxyRoute> {
        routes.iter().find(|route| path.starts_with(&route.prefix))
    }

    /// Upstream URL for a matched request, path and query intact.
    pub fn upstream_url(&self, uri: &Uri) -> String {
        match uri.path_and_query() {
            Some(pq) => format!("{}{}", self.target, pq),
            None => format!("{}{}", self.target, uri.path()),
        }
    }
}

/// Forward a matched request to its upstream and relay the response.
///
/// An unreachable upstream becomes a 502 rather than an error; the dev
/// server itself stays up.
pub async fn forward(
    client: &reqwest::Client,
    route: &ProxyRoute,
    req: Request<Body>,
) -> Result<Response<Body>> {
    let url = route.upstream_url(req.uri());
    tracing::debug!(prefix = %route.prefix, %url, "proxying request");

    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|err| CliError::Server(format!("failed to read request body: {err}")))?;

    let mut headers = parts.headers.clone();
    headers.remove(header::CONNECTION);
    if route.change_origin {
        headers.remove(header::HOST);
    }

    let upstream = client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(%url, "proxy target unreachable: {err}");
            return Ok(Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .body(Body::from(format!("proxy target unreachable: {url}")))
                .map_err(|err| CliError::Server(err.to_string()))?);
        }
    };

    let status = upstream.status();
    let response_headers = relay_headers(upstream.headers());
    let bytes = upstream
        .bytes()
        .await
        .map_err(|err| CliError::Server(format!("failed to read proxy response: {err}")))?;

    let mut response = Response::builder()
        .status(status)
        .body(Body::from(bytes))
        .map_err(|err| CliError::Server(err.to_string()))?;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Copy upstream response headers, keeping every value of repeated
/// headers such as Set-Cookie.
fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        headers.append(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> Vec<ProxyRoute> {
        vec![
            ProxyRoute {
                prefix: "/api/v2".to_string(),
                target: "http://localhost:9000".to_string(),
                change_origin: true,
            },
            ProxyRoute {
                prefix: "/api".to_string(),
                target: "http://localhost:8080".to_string(),
                change_origin: false,
            },
        ]
    }

    #[test]
    fn test_first_matching_prefix_wins() {
        let routes = routes();
        let hit = ProxyRoute::match_route(&routes, "/api/v2/users").unwrap();
        assert_eq!(hit.target, "http://localhost:9000");

        let hit = ProxyRoute::match_route(&routes, "/api/users").unwrap();
        assert_eq!(hit.target, "http://localhost:8080");
    }

    #[test]
    fn test_unmatched_path_returns_none() {
        assert!(ProxyRoute::match_route(&routes(), "/static/app.js").is_none());
    }

    #[test]
    fn test_upstream_url_keeps_path_and_query() {
        let route = &routes()[1];
        let uri: Uri = "/api/users?page=2".parse().unwrap();
        assert_eq!(
            route.upstream_url(&uri),
            "http://localhost:8080/api/users?page=2"
        );
    }

    #[test]
    fn test_relay_headers_keeps_repeated_set_cookie() {
        let mut upstream = HeaderMap::new();
        upstream.append(header::SET_COOKIE, "session=abc".parse().unwrap());
        upstream.append(header::SET_COOKIE, "theme=dark".parse().unwrap());
        upstream.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        let relayed = relay_headers(&upstream);
        let cookies: Vec<_> = relayed.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["session=abc", "theme=dark"]);
        assert_eq!(relayed.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_from_config_preserves_declaration_order() {
        let json = r#"{
            "proxy": {
                "/api/v2": { "target": "http://localhost:9000/" },
                "/api": { "target": "http://localhost:8080", "changeOrigin": true }
            }
        }"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let routes = ProxyRoute::from_config(&config);

        assert_eq!(routes[0].prefix, "/api/v2");
        assert_eq!(routes[0].target, "http://localhost:9000");
        assert!(!routes[0].change_origin);
        assert_eq!(routes[1].prefix, "/api");
        assert!(routes[1].change_origin);
    }
}
