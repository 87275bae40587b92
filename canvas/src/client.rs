//! Canvas REST adapter.
//!
//! Only the handful of endpoints the grader needs: assignment groups, group
//! membership, course enrollments and single submissions. Every list endpoint
//! is paginated through `Link` headers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::PlatformError;
use crate::platform::GradingPlatform;
use crate::types::{Assignment, CourseQuery, Student, SubmissionInfo};

const PAGE_SIZE: &str = "100";

/// Canvas API client authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct CanvasClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct AssignmentGroup {
    name: String,
    #[serde(default)]
    assignments: Vec<Assignment>,
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    url: String,
    #[serde(default)]
    filename: Option<String>,
}

impl CanvasClient {
    pub fn new(server: &str, token: impl Into<String>) -> Result<Self, PlatformError> {
        let mut normalized = server.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|err| PlatformError::InvalidServer {
            server: server.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: token.into(),
        })
    }

    /// Build a client whose token is read from the environment variable `token_env`.
    pub fn from_env(server: &str, token_env: &str) -> Result<Self, PlatformError> {
        let token = std::env::var(token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PlatformError::MissingToken {
                var: token_env.to_string(),
            })?;
        Self::new(server, token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PlatformError> {
        self.base
            .join(path)
            .map_err(|err| PlatformError::InvalidServer {
                server: self.base.to_string(),
                reason: err.to_string(),
            })
    }

    async fn send(&self, url: Url) -> Result<Response, PlatformError> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| PlatformError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "canvas request failed");
            return Err(PlatformError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let mut url = self.endpoint(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let response = self.send(url.clone()).await?;
        response
            .json()
            .await
            .map_err(|source| PlatformError::Http {
                url: url.to_string(),
                source,
            })
    }

    /// GET every page of a list endpoint.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, PlatformError> {
        let mut first = self.endpoint(path)?;
        {
            let mut pairs = first.query_pairs_mut();
            pairs.append_pair("per_page", PAGE_SIZE);
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let response = self.send(url.clone()).await?;
            next = next_page(response.headers());
            let page: Vec<T> = response
                .json()
                .await
                .map_err(|source| PlatformError::Http {
                    url: url.to_string(),
                    source,
                })?;
            items.extend(page);
        }
        Ok(items)
    }

    async fn find_named(
        &self,
        path: &str,
        name: &str,
        what: &str,
    ) -> Result<NamedRecord, PlatformError> {
        let records: Vec<NamedRecord> = self.get_paginated(path, &[]).await?;
        records
            .into_iter()
            .find(|record| record.name == name)
            .ok_or_else(|| PlatformError::NotFound {
                what: format!("{what} '{name}'"),
            })
    }
}

#[async_trait]
impl GradingPlatform for CanvasClient {
    #[instrument(skip_all, fields(course_id = query.course_id))]
    async fn list_assignments(&self, query: &CourseQuery) -> Result<Vec<Assignment>, PlatformError> {
        let path = format!("api/v1/courses/{}/assignment_groups", query.course_id);
        let groups: Vec<AssignmentGroup> = self
            .get_paginated(&path, &[("include[]", "assignments")])
            .await?;
        let group = groups
            .into_iter()
            .find(|group| group.name == query.assignment_group)
            .ok_or_else(|| PlatformError::NotFound {
                what: format!("assignment group '{}'", query.assignment_group),
            })?;
        info!(count = group.assignments.len(), "fetched assignments");
        Ok(group.assignments)
    }

    #[instrument(skip_all, fields(course_id = query.course_id))]
    async fn list_students(&self, query: &CourseQuery) -> Result<Vec<Student>, PlatformError> {
        let mut students: Vec<Student> = match (&query.groupset, &query.group) {
            (Some(groupset), Some(group)) => {
                let category = self
                    .find_named(
                        &format!("api/v1/courses/{}/group_categories", query.course_id),
                        groupset,
                        "group set",
                    )
                    .await?;
                let group = self
                    .find_named(
                        &format!("api/v1/group_categories/{}/groups", category.id),
                        group,
                        "group",
                    )
                    .await?;
                self.get_paginated(&format!("api/v1/groups/{}/users", group.id), &[])
                    .await?
            }
            (groupset, group) => {
                if groupset.is_some() || group.is_some() {
                    warn!("groupset and group must both be set; listing all course students");
                }
                self.get_paginated(
                    &format!("api/v1/courses/{}/users", query.course_id),
                    &[("enrollment_type[]", "student")],
                )
                .await?
            }
        };
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        info!(count = students.len(), "fetched students");
        Ok(students)
    }

    #[instrument(skip_all, fields(assignment = assignment.id, student = student.id))]
    async fn download_submission(
        &self,
        assignment: &Assignment,
        student: &Student,
        dest: &Path,
    ) -> Result<PathBuf, PlatformError> {
        let path = format!(
            "api/v1/courses/{}/assignments/{}/submissions/{}",
            assignment.course_id, assignment.id, student.id
        );
        let submission: Submission = self.get_json(&path, &[]).await?;
        let attachment = submission
            .attachments
            .last()
            .ok_or_else(|| PlatformError::NotFound {
                what: format!("submission attachment for {}", student.name),
            })?;
        debug!(filename = ?attachment.filename, "downloading attachment");

        let url = Url::parse(&attachment.url).map_err(|err| PlatformError::InvalidServer {
            server: attachment.url.clone(),
            reason: err.to_string(),
        })?;
        let mut response = self.send(url.clone()).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PlatformError::Io {
                    context: format!("create {}", parent.display()),
                    source,
                })?;
        }
        let partial = dest.with_extension("zip.part");
        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|source| PlatformError::Io {
                context: format!("create {}", partial.display()),
                source,
            })?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| PlatformError::Http {
                url: url.to_string(),
                source,
            })?
        {
            file.write_all(&chunk)
                .await
                .map_err(|source| PlatformError::Io {
                    context: format!("write {}", partial.display()),
                    source,
                })?;
        }
        file.flush().await.map_err(|source| PlatformError::Io {
            context: format!("flush {}", partial.display()),
            source,
        })?;
        drop(file);
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|source| PlatformError::Io {
                context: format!("move download into {}", dest.display()),
                source,
            })?;

        info!(dest = %dest.display(), "submission downloaded");
        Ok(dest.to_path_buf())
    }

    #[instrument(skip_all, fields(assignment = assignment.id, student = student.id))]
    async fn get_submission(
        &self,
        assignment: &Assignment,
        student: &Student,
    ) -> Result<SubmissionInfo, PlatformError> {
        let path = format!(
            "api/v1/courses/{}/assignments/{}/submissions/{}",
            assignment.course_id, assignment.id, student.id
        );
        let info: SubmissionInfo = self
            .get_json(&path, &[("include[]", "submission_comments")])
            .await?;
        debug!(attempt = ?info.attempt, seconds_late = info.seconds_late, "fetched submission");
        Ok(info)
    }
}

fn next_page(headers: &HeaderMap) -> Option<Url> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    let next = parse_next_link(raw)?;
    Url::parse(&next).ok()
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
