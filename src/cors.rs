//! Cross-origin layer handed to the HTTP layer

use std::time::Duration;

use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::config::CorsConfig;

/// Build the CORS layer described by `config`
///
/// Returns `None` when CORS is disabled. Empty method and header lists fall
/// back to the usual browser-facing defaults. A `"*"` origin allows every
/// origin; combined with credentials the request origin is mirrored instead,
/// since browsers reject a wildcard on credentialed responses. Entries that
/// are not valid header values are skipped with a warning.
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let methods: Vec<Method> = if config.allow_methods.is_empty() {
        vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ]
    } else {
        parse_all(&config.allow_methods, "method", |m| {
            Method::from_bytes(m.as_bytes()).ok()
        })
    };

    let allow_headers: Vec<HeaderName> = if config.allow_headers.is_empty() {
        vec![
            http::header::ORIGIN,
            http::header::CONTENT_LENGTH,
            http::header::CONTENT_TYPE,
        ]
    } else {
        parse_all(&config.allow_headers, "header", |h| {
            HeaderName::from_bytes(h.as_bytes()).ok()
        })
    };

    let expose_headers: Vec<HeaderName> = parse_all(&config.expose_headers, "header", |h| {
        HeaderName::from_bytes(h.as_bytes()).ok()
    });

    let allow_origin = if config.allow_origins.iter().any(|o| o == "*") {
        if config.allow_credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        AllowOrigin::list(parse_all(&config.allow_origins, "origin", |o| {
            HeaderValue::from_str(o).ok()
        }))
    };

    tracing::info!(
        origins = ?config.allow_origins,
        credentials = config.allow_credentials,
        "CORS enabled"
    );

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(AllowMethods::list(methods))
            .allow_headers(AllowHeaders::list(allow_headers))
            .expose_headers(ExposeHeaders::list(expose_headers))
            .allow_credentials(config.allow_credentials)
            .max_age(Duration::from_secs(12 * 60 * 60)),
    )
}

fn parse_all<T>(values: &[String], kind: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            let parsed = parse(value.trim());
            if parsed.is_none() {
                tracing::warn!(kind = kind, value = %value, "Ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_METHOD,
        ORIGIN,
    };
    use http::{Request, Response};
    use tower::{service_fn, Layer, ServiceExt};

    use super::*;

    async fn send(layer: CorsLayer, request: Request<String>) -> Response<String> {
        let service = layer.layer(service_fn(|_req: Request<String>| async {
            Ok::<_, Infallible>(Response::new(String::new()))
        }));
        service.oneshot(request).await.unwrap()
    }

    fn get_from(origin: &str) -> Request<String> {
        Request::get("/stream/list")
            .header(ORIGIN, origin)
            .body(String::new())
            .unwrap()
    }

    fn enabled(origins: &[&str]) -> CorsConfig {
        CorsConfig {
            enabled: true,
            allow_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled() {
        assert!(cors_layer(&CorsConfig::default()).is_none());
    }

    #[tokio::test]
    async fn test_listed_origin_only() {
        let layer = cors_layer(&enabled(&["https://viewer.example"])).unwrap();

        let res = send(layer.clone(), get_from("https://viewer.example")).await;
        assert_eq!(
            res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://viewer.example"
        );

        let res = send(layer, get_from("https://other.example")).await;
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_wildcard_origin() {
        let layer = cors_layer(&enabled(&["*"])).unwrap();

        let res = send(layer, get_from("http://localhost:3000")).await;
        assert_eq!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }

    #[tokio::test]
    async fn test_wildcard_with_credentials_mirrors_origin() {
        let config = CorsConfig {
            allow_credentials: true,
            ..enabled(&["*"])
        };
        let layer = cors_layer(&config).unwrap();

        let res = send(layer, get_from("http://localhost:3000")).await;
        assert_eq!(
            res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            res.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_preflight_defaults() {
        let layer = cors_layer(&enabled(&["*"])).unwrap();

        let preflight = Request::options("/stream/list")
            .header(ORIGIN, "http://localhost:3000")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(String::new())
            .unwrap();
        let res = send(layer, preflight).await;

        let methods = res
            .headers()
            .get(ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("OPTIONS"));
        assert_eq!(res.headers().get(ACCESS_CONTROL_MAX_AGE).unwrap(), "43200");
    }

    #[tokio::test]
    async fn test_method_override_skips_invalid() {
        let config = CorsConfig {
            allow_methods: vec!["GET".into(), "BAD METHOD".into()],
            ..enabled(&["*"])
        };
        let layer = cors_layer(&config).unwrap();

        let preflight = Request::options("/stream/list")
            .header(ORIGIN, "http://localhost:3000")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(String::new())
            .unwrap();
        let res = send(layer, preflight).await;

        assert_eq!(res.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET");
    }
}
