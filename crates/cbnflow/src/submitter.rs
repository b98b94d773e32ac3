//! Job submitter - turns input files into tracked jobs.
//!
//! Files are sent one at a time, in filename order. Each accepted submission
//! is registered under its execution id before the next file is read, so the
//! listener can match a result the moment it arrives. A file that cannot be
//! read or is rejected by the service is logged and skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::ApiClient;
use crate::decode::{DecodeTier, decode_source};
use crate::error::RunError;
use crate::mode::ModeProfile;
use crate::project::ProjectContext;
use crate::protocol::{SubmitData, SubmitRequest};
use crate::registry::JobRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// What a batch submission produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    /// Accepted job ids, in submission order.
    pub job_ids: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl SubmissionReport {
    fn skip(&mut self, filename: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedFile {
            filename: filename.to_string(),
            reason: reason.into(),
        });
    }
}

pub struct JobSubmitter {
    client: Arc<ApiClient>,
    profile: ModeProfile,
    project: ProjectContext,
    registry: JobRegistry,
}

impl JobSubmitter {
    pub fn new(
        client: Arc<ApiClient>,
        profile: ModeProfile,
        project: ProjectContext,
        registry: JobRegistry,
    ) -> Self {
        Self {
            client,
            profile,
            project,
            registry,
        }
    }

    /// Submit every regular file directly inside `dir`.
    pub async fn submit_dir(&self, dir: &Path) -> Result<SubmissionReport, RunError> {
        let files = list_input_files(dir).await.map_err(|source| RunError::InputDir {
            path: dir.display().to_string(),
            source,
        })?;

        let workflow = self.profile.workflow();
        let mut report = SubmissionReport::default();

        for path in files {
            let filename = file_name(&path);
            tracing::info!(filename = %filename, "Processing");

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "Failed to read input file");
                    report.skip(&filename, format!("read failed: {e}"));
                    continue;
                }
            };

            let decoded = decode_source(&bytes, &self.profile.encoding);
            if decoded.tier != DecodeTier::Primary {
                tracing::warn!(
                    filename = %filename,
                    encoding = decoded.encoding_label,
                    tier = ?decoded.tier,
                    "Input not valid in primary encoding, fell back"
                );
            }

            let body = SubmitRequest {
                project_id: &self.project.project_id,
                wallet_id: &self.project.wallet_id,
                data: SubmitData {
                    content: &decoded.text,
                },
            };

            match self.client.submit(&workflow, &body).await {
                Ok(response) => match response.execution_id.filter(|id| !id.is_empty()) {
                    Some(job_id) => {
                        tracing::debug!(filename = %filename, job_id = %job_id, "Submitted");
                        self.registry.register(job_id.clone(), filename);
                        report.job_ids.push(job_id);
                    }
                    None => {
                        tracing::warn!(filename = %filename, "No execution_id in response");
                        report.skip(&filename, "no execution_id in response");
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        filename = %filename,
                        status = ?e.status(),
                        error = %e,
                        "Failed to submit file"
                    );
                    report.skip(&filename, e.to_string());
                }
            }
        }

        tracing::info!(
            submitted = report.job_ids.len(),
            skipped = report.skipped.len(),
            "Submission finished"
        );
        Ok(report)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Regular files directly inside `dir` (symlinks followed), sorted by path.
pub async fn list_input_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping entry"),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn submitter(server: &MockServer, registry: JobRegistry) -> JobSubmitter {
        let client = ApiClient::new(&server.uri(), Some("t"), Duration::from_secs(5)).unwrap();
        JobSubmitter::new(
            Arc::new(client),
            ModeProfile::new("cpp", "utf-8", "js"),
            ProjectContext {
                project_id: "p1".to_string(),
                wallet_id: "w1".to_string(),
            },
            registry,
        )
    }

    fn accept(content: &str, execution_id: &str) -> Mock {
        Mock::given(method("POST"))
            .and(path("/dags/api-workflow-cpp-01"))
            .and(body_partial_json(serde_json::json!({"data": {"content": content}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"execution_id": execution_id})),
            )
    }

    #[tokio::test]
    async fn lists_only_regular_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let files = list_input_files(dir.path()).await.unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn registers_each_accepted_file() {
        let server = MockServer::start().await;
        accept("alpha", "j1").expect(1).mount(&server).await;
        accept("beta", "j2").expect(1).mount(&server).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("b.txt"), "beta").unwrap();

        let registry = JobRegistry::new();
        let report = submitter(&server, registry.clone())
            .submit_dir(dir.path())
            .await
            .unwrap();

        assert_eq!(report.job_ids, vec!["j1", "j2"]);
        assert!(report.skipped.is_empty());
        assert_eq!(registry.filename("j1").as_deref(), Some("a.txt"));
        assert_eq!(registry.filename("j2").as_deref(), Some("b.txt"));
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"data": {"content": "bad"}})))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"data": {"content": "odd"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "queued"})))
            .mount(&server)
            .await;
        accept("good", "j3").mount(&server).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.txt"), "bad").unwrap();
        std::fs::write(dir.path().join("2.txt"), "odd").unwrap();
        std::fs::write(dir.path().join("3.txt"), "good").unwrap();

        let registry = JobRegistry::new();
        let report = submitter(&server, registry.clone())
            .submit_dir(dir.path())
            .await
            .unwrap();

        assert_eq!(report.job_ids, vec!["j3"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(skipped, vec!["1.txt", "2.txt"]);
        assert!(report.skipped[0].reason.contains("500"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_file_is_still_submitted() {
        let server = MockServer::start().await;
        accept("ab\u{FFFD}cd", "j1").expect(1).mount(&server).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("legacy.dsx"), b"ab\x81cd").unwrap();

        let report = submitter(&server, JobRegistry::new())
            .submit_dir(dir.path())
            .await
            .unwrap();
        assert_eq!(report.job_ids, vec!["j1"]);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let server = MockServer::start().await;
        let err = submitter(&server, JobRegistry::new())
            .submit_dir(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::InputDir { .. }));
    }
}
