//! Google Drive v3 REST client
//!
//! A blocking client bound to one access token. Each request runs on the
//! calling thread; the server invokes it from blocking worker threads.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::BackendError;
use crate::storage::extract;
use crate::storage::results::{
    DOCX_MIME_TYPE, DriveObject, GOOGLE_DOC_MIME_TYPE, ListQuery, ObjectKind, PDF_MIME_TYPE,
    TEXT_MIME_TYPE,
};
use crate::storage::ObjectStore;

/// Upper bound on pages fetched for one list call
pub const MAX_LIST_PAGES: usize = 50;

const FILE_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, modifiedTime, parents)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    id: String,
    name: String,
    mime_type: String,
    // Drive encodes int64 fields as strings
    size: Option<String>,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    parents: Vec<String>,
}

impl From<FileResource> for DriveObject {
    fn from(file: FileResource) -> Self {
        DriveObject {
            kind: ObjectKind::from_mime_type(&file.mime_type),
            size: file.size.and_then(|s| s.parse().ok()),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            modified_time: file.modified_time,
            parents: file.parents,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CopyResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Drive client for a single signed-in account
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    api_base: String,
    access_token: String,
    page_size: u32,
}

impl DriveClient {
    pub fn new(http: Client, api_base: &str, access_token: &str, page_size: u32) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            page_size,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.bearer_auth(&self.access_token).send()?;
        check_status(response)
    }

    fn download(&self, request: RequestBuilder) -> Result<Vec<u8>, BackendError> {
        Ok(self.send(request)?.bytes()?.to_vec())
    }
}

/// Maps a non-success response to `BackendError::Api`, keeping the API's
/// own message when the body carries one.
fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

impl ObjectStore for DriveClient {
    fn list(&self, query: &ListQuery) -> Result<Vec<DriveObject>, BackendError> {
        let q = query.to_drive_query();
        debug!("Drive list: {}", q);

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_LIST_PAGES {
            let mut request = self.http.get(self.url("files")).query(&[
                ("q", q.as_str()),
                ("fields", FILE_FIELDS),
                ("orderBy", "name"),
            ]);
            request = request.query(&[("pageSize", self.page_size)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = self.send(request)?.json()?;
            objects.extend(page.files.into_iter().map(DriveObject::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(objects),
            }
        }

        warn!("Drive list stopped after {} pages: {}", MAX_LIST_PAGES, q);
        Ok(objects)
    }

    fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.send(self.http.delete(self.url(&format!("files/{}", id))))?;
        Ok(())
    }

    fn reparent(&self, id: &str, add_parent: &str, remove_parents: &[String]) -> Result<(), BackendError> {
        let remove = remove_parents.join(",");
        let request = self
            .http
            .patch(self.url(&format!("files/{}", id)))
            .query(&[
                ("addParents", add_parent),
                ("removeParents", remove.as_str()),
                ("fields", "id, parents"),
            ])
            .json(&json!({}));
        self.send(request)?;
        Ok(())
    }

    fn copy(&self, id: &str, new_parent: &str, name: &str) -> Result<String, BackendError> {
        let request = self
            .http
            .post(self.url(&format!("files/{}/copy", id)))
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "parents": [new_parent] }));
        let copied: CopyResponse = self.send(request)?.json()?;
        Ok(copied.id)
    }

    fn get_content(&self, object: &DriveObject) -> Result<String, BackendError> {
        let media = || {
            self.http
                .get(self.url(&format!("files/{}", object.id)))
                .query(&[("alt", "media")])
        };

        match object.mime_type.as_str() {
            GOOGLE_DOC_MIME_TYPE => {
                let request = self
                    .http
                    .get(self.url(&format!("files/{}/export", object.id)))
                    .query(&[("mimeType", TEXT_MIME_TYPE)]);
                Ok(self.send(request)?.text()?)
            }
            TEXT_MIME_TYPE => Ok(self.send(media())?.text()?),
            PDF_MIME_TYPE => extract::pdf_text(&self.download(media())?),
            DOCX_MIME_TYPE => extract::docx_text(&self.download(media())?),
            other => Err(BackendError::UnsupportedContent(other.to_string())),
        }
    }
}
