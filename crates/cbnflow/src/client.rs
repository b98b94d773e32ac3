//! HTTP client for the conversion service.
//!
//! Wraps a single `reqwest::Client` carrying the bearer token and user agent.
//! Endpoints are built by appending path segments to the parsed base URL.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::CBNFLOW_VERSION;
use crate::error::ClientError;
use crate::protocol::{BlobLocator, Project, ProjectList, SubmitRequest, SubmitResponse};

pub(crate) fn user_agent() -> String {
    format!("cbnflow/{}", CBNFLOW_VERSION)
}

/// Authenticated client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ApiClient {
    /// Build a client. `token` becomes the default `Authorization` header.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Ok(value) = HeaderValue::from_str(&user_agent()) {
            headers.insert(USER_AGENT, value);
        }

        // No client-wide timeout: the event stream stays open for the whole run.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base,
            client,
            request_timeout,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET projects`
    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        let url = self.endpoint(&["projects"])?;
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let list: ProjectList = check(response).await?.json().await?;
        Ok(list.results)
    }

    /// `POST dags/<workflow>` with one file's content.
    pub async fn submit(
        &self,
        workflow: &str,
        body: &SubmitRequest<'_>,
    ) -> Result<SubmitResponse, ClientError> {
        let url = self.endpoint(&["dags", workflow])?;
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET stream`, returning the open response for incremental reading.
    pub async fn open_stream(&self) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(&["stream"])?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        check(response).await
    }

    /// `GET datalake/<container>/<blob_id>`, returning the raw body.
    ///
    /// Only `200 OK` carries a blob; any other status is an error.
    pub async fn fetch_blob(&self, locator: &BlobLocator) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(&["datalake", &locator.container, &locator.blob_id])?;
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check(response).await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Turn a non-2xx response into [`ClientError::Status`], keeping the body text.
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SubmitData;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Some("tok"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_appends_and_escapes_segments() {
        let client =
            ApiClient::new("https://api.example.com/v1/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["dags", "api-workflow-cpp-01"]).unwrap().as_str(),
            "https://api.example.com/v1/dags/api-workflow-cpp-01"
        );
        assert_eq!(
            client.endpoint(&["datalake", "c 1", "a/b"]).unwrap().as_str(),
            "https://api.example.com/v1/datalake/c%201/a%2Fb"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            ApiClient::new("mailto:someone@example.com", None, Duration::from_secs(1)),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(ApiClient::new("not a url", None, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn list_projects_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": "p1", "wallet_id": "w1", "name": "demo", "namespace": "ns"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let projects = client(&server).list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "p1");
    }

    #[tokio::test]
    async fn submit_posts_body_to_workflow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dags/api-workflow-cpp-01"))
            .and(body_json(serde_json::json!({
                "project_id": "p1",
                "wallet_id": "w1",
                "data": {"content": "int main() {}"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"execution_id": "e1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = SubmitRequest {
            project_id: "p1",
            wallet_id: "w1",
            data: SubmitData {
                content: "int main() {}",
            },
        };
        let response = client(&server)
            .submit("api-workflow-cpp-01", &body)
            .await
            .unwrap();
        assert_eq!(response.execution_id.as_deref(), Some("e1"));
    }

    #[tokio::test]
    async fn non_success_keeps_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client(&server).list_projects().await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_blob_uses_locator_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datalake/c1/blob9"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let locator = BlobLocator {
            container: "c1".to_string(),
            blob_id: "blob9".to_string(),
        };
        let body = client(&server).fetch_blob(&locator).await.unwrap();
        assert_eq!(body, b"{}");
    }

    #[tokio::test]
    async fn fetch_blob_requires_ok() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datalake/c1/pending"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({"Final_Result": "early"})),
            )
            .mount(&server)
            .await;

        let locator = BlobLocator {
            container: "c1".to_string(),
            blob_id: "pending".to_string(),
        };
        let err = client(&server).fetch_blob(&locator).await.unwrap_err();
        assert_eq!(err.status(), Some(202));
    }
}
