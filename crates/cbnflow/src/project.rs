//! Project selection.

use crate::client::ApiClient;
use crate::error::RunError;
use crate::protocol::Project;

/// Routing context attached to every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_id: String,
    pub wallet_id: String,
}

/// First project matching `name` (and `namespace`, when given).
pub fn select_project<'a>(
    projects: &'a [Project],
    name: &str,
    namespace: Option<&str>,
) -> Option<&'a Project> {
    projects.iter().find(|p| {
        p.name.as_deref() == Some(name)
            && namespace.is_none_or(|ns| p.namespace.as_deref() == Some(ns))
    })
}

/// Look up the configured project on the service.
pub async fn find_project(
    client: &ApiClient,
    name: &str,
    namespace: Option<&str>,
) -> Result<ProjectContext, RunError> {
    let projects = client.list_projects().await.map_err(RunError::Lookup)?;

    let project =
        select_project(&projects, name, namespace).ok_or_else(|| RunError::ProjectNotFound {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        })?;

    tracing::info!(project = name, project_id = %project.id, "Using project");
    Ok(ProjectContext {
        project_id: project.id.clone(),
        wallet_id: project.wallet_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project(id: &str, name: &str, namespace: Option<&str>) -> Project {
        Project {
            id: id.to_string(),
            wallet_id: format!("w-{id}"),
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
        }
    }

    #[test]
    fn select_by_name_only() {
        let projects = vec![
            project("p1", "other", Some("a")),
            project("p2", "migration", Some("b")),
            project("p3", "migration", Some("c")),
        ];
        assert_eq!(
            select_project(&projects, "migration", None).map(|p| p.id.as_str()),
            Some("p2")
        );
    }

    #[test]
    fn select_by_name_and_namespace() {
        let projects = vec![
            project("p2", "migration", Some("b")),
            project("p3", "migration", Some("c")),
        ];
        assert_eq!(
            select_project(&projects, "migration", Some("c")).map(|p| p.id.as_str()),
            Some("p3")
        );
        assert!(select_project(&projects, "migration", Some("z")).is_none());
    }

    #[tokio::test]
    async fn find_project_returns_context() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"id": "p1", "wallet_id": "w1", "name": "migration", "namespace": "team"}
                ]
            })))
            .mount(&server)
            .await;
        let client = ApiClient::new(&server.uri(), Some("t"), Duration::from_secs(5)).unwrap();

        let ctx = find_project(&client, "migration", Some("team"))
            .await
            .unwrap();
        assert_eq!(
            ctx,
            ProjectContext {
                project_id: "p1".to_string(),
                wallet_id: "w1".to_string(),
            }
        );

        let err = find_project(&client, "missing", None).await.unwrap_err();
        assert!(matches!(err, RunError::ProjectNotFound { .. }));
    }

    #[tokio::test]
    async fn lookup_http_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = ApiClient::new(&server.uri(), Some("t"), Duration::from_secs(5)).unwrap();

        let err = find_project(&client, "migration", None).await.unwrap_err();
        assert!(matches!(err, RunError::Lookup(_)));
    }
}
