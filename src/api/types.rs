use serde::{Deserialize, Serialize};

use crate::domain::EventId;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: None,
        }
    }

    pub fn error_with_kind(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::error(message)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdListRequest {
    pub ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ViewAsQuery {
    #[serde(rename = "as")]
    pub as_role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedEventResponse {
    pub event_id: EventId,
}

#[derive(Debug, Serialize)]
pub struct UniversityDto {
    pub university_id: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CompetenceDto {
    pub competence_id: i32,
    pub name: String,
}
