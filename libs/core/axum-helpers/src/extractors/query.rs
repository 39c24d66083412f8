use crate::errors::AppError;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// Query string extractor whose rejection is the JSON `QUERY_EXTRACTION` body
/// instead of axum's plain-text 400.
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Filter {
        name: Option<String>,
        limit: Option<u64>,
    }

    fn app() -> Router {
        Router::new().route(
            "/",
            get(|QueryParams(f): QueryParams<Filter>| async move {
                format!("{}:{}", f.name.unwrap_or_default(), f.limit.unwrap_or(0))
            }),
        )
    }

    async fn get_uri(uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_query_parses() {
        let (status, body) = get_uri("/?name=lamp&limit=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"lamp:3");
    }

    #[tokio::test]
    async fn test_repeated_key_renders_json_error() {
        let (status, body) = get_uri("/?name=a&name=b").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 1007);
        assert_eq!(json["error"], "QUERY_EXTRACTION");
        assert!(json["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_mistyped_value_renders_json_error() {
        let (status, body) = get_uri("/?limit=many").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "QUERY_EXTRACTION");
    }
}
