//! Request DTOs for the HTTP API.

use serde::Deserialize;
use validator::Validate;

use crate::auth::RegistrationRequest;
use crate::file::UploadRequest;

/// An identifier sent either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdParam {
    Number(i64),
    Text(String),
}

impl IdParam {
    /// The identifier as text, for [`crate::file::parse_id`].
    pub fn into_raw(self) -> String {
        match self {
            IdParam::Number(n) => n.to_string(),
            IdParam::Text(s) => s,
        }
    }
}

/// `POST /users` body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<CreateUserRequest> for RegistrationRequest {
    fn from(req: CreateUserRequest) -> Self {
        RegistrationRequest {
            email: req.email,
            password: req.password,
        }
    }
}

/// `POST /files` body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    #[validate(length(max = 255, message = "Name too long"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub parent_id: Option<IdParam>,
    #[serde(default)]
    pub is_public: bool,
    /// Base64 content.
    pub data: Option<String>,
}

impl From<CreateFileRequest> for UploadRequest {
    fn from(req: CreateFileRequest) -> Self {
        UploadRequest {
            name: req.name,
            entry_type: req.entry_type,
            parent_id: req.parent_id.map(IdParam::into_raw),
            is_public: req.is_public,
            data: req.data,
        }
    }
}

/// `GET /files` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    pub parent_id: Option<String>,
    pub page: Option<String>,
}

impl ListFilesQuery {
    /// Zero-based page. Missing or malformed values mean the first page.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// `GET /files/:id/data` query.
#[derive(Debug, Default, Deserialize)]
pub struct FileDataQuery {
    /// Thumbnail width.
    pub size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MAX_NAME_LENGTH;
    use serde_json::json;

    #[test]
    fn test_create_file_request_parent_id_forms() {
        let numeric: CreateFileRequest =
            serde_json::from_value(json!({"name": "x", "type": "folder", "parentId": 5})).unwrap();
        assert_eq!(numeric.parent_id, Some(IdParam::Number(5)));

        let text: CreateFileRequest =
            serde_json::from_value(json!({"name": "x", "type": "folder", "parentId": "5"}))
                .unwrap();
        assert_eq!(text.parent_id.clone().map(IdParam::into_raw), Some("5".to_string()));

        let upload = UploadRequest::from(numeric);
        assert_eq!(upload.parent_id.as_deref(), Some("5"));
        assert_eq!(upload.entry_type.as_deref(), Some("folder"));
        assert!(!upload.is_public);
    }

    #[test]
    fn test_create_file_request_defaults() {
        let req: CreateFileRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.name.is_none());
        assert!(req.parent_id.is_none());
        assert!(!req.is_public);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_file_request_name_length() {
        let req: CreateFileRequest =
            serde_json::from_value(json!({"name": "n".repeat(MAX_NAME_LENGTH + 1)})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_list_query_page() {
        let query = |page: Option<&str>| ListFilesQuery {
            parent_id: None,
            page: page.map(str::to_string),
        };
        assert_eq!(query(None).page(), 0);
        assert_eq!(query(Some("3")).page(), 3);
        assert_eq!(query(Some("-1")).page(), 0);
        assert_eq!(query(Some("abc")).page(), 0);
    }
}
