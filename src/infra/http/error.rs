use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::categories::AdminCategoryError;
use crate::application::admin::comments::AdminCommentError;
use crate::application::admin::menu::AdminMenuError;
use crate::application::admin::pages::AdminPageError;
use crate::application::admin::posts::AdminPostError;
use crate::application::admin::settings::AdminSettingsError;
use crate::application::admin::tags::AdminTagError;
use crate::application::content::CommentSubmitError;
use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const IN_USE: &str = "in_use";
    pub const COMMENTS_DISABLED: &str = "comments_disabled";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn invalid(message: &'static str, field: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            message,
            Some(field.to_string()),
        )
    }

    fn in_use(message: &'static str, count: u64) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            codes::IN_USE,
            message,
            Some(format!("referenced by {count} post(s)")),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::error",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => ApiError::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => ApiError::not_found("resource not found"),
            RepoError::InvalidInput { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound | AppError::Domain(DomainError::NotFound { .. }) => {
                ApiError::not_found("resource not found")
            }
            AppError::Validation(message)
            | AppError::Domain(DomainError::Validation { message }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            AppError::Infra(infra) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UNAVAILABLE,
                "Service temporarily unavailable",
                Some(infra.to_string()),
            ),
            other => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Unexpected error occurred",
                Some(other.to_string()),
            ),
        }
    }
}

impl From<AdminPostError> for ApiError {
    fn from(err: AdminPostError) -> Self {
        match err {
            AdminPostError::ConstraintViolation(field) => ApiError::invalid("Invalid post", field),
            AdminPostError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminCategoryError> for ApiError {
    fn from(err: AdminCategoryError) -> Self {
        match err {
            AdminCategoryError::ConstraintViolation(field) => {
                ApiError::invalid("Invalid category", field)
            }
            AdminCategoryError::InUse { count } => ApiError::in_use("Category is in use", count),
            AdminCategoryError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminTagError> for ApiError {
    fn from(err: AdminTagError) -> Self {
        match err {
            AdminTagError::ConstraintViolation(field) => ApiError::invalid("Invalid tag", field),
            AdminTagError::InUse { count } => ApiError::in_use("Tag is in use", count),
            AdminTagError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminPageError> for ApiError {
    fn from(err: AdminPageError) -> Self {
        match err {
            AdminPageError::ConstraintViolation(field) => ApiError::invalid("Invalid page", field),
            AdminPageError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminMenuError> for ApiError {
    fn from(err: AdminMenuError) -> Self {
        match err {
            AdminMenuError::ConstraintViolation(field) => {
                ApiError::invalid("Invalid menu item", field)
            }
            AdminMenuError::Destination(domain) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid menu destination",
                Some(domain.to_string()),
            ),
            AdminMenuError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminCommentError> for ApiError {
    fn from(err: AdminCommentError) -> Self {
        match err {
            AdminCommentError::Repo(repo) => repo.into(),
        }
    }
}

impl From<AdminSettingsError> for ApiError {
    fn from(err: AdminSettingsError) -> Self {
        match err {
            AdminSettingsError::ConstraintViolation(field) => {
                ApiError::invalid("Invalid settings", field)
            }
            AdminSettingsError::Repo(repo) => repo.into(),
        }
    }
}

impl From<CommentSubmitError> for ApiError {
    fn from(err: CommentSubmitError) -> Self {
        match err {
            CommentSubmitError::Disabled => ApiError::new(
                StatusCode::FORBIDDEN,
                codes::COMMENTS_DISABLED,
                "Comments are disabled",
                None,
            ),
            CommentSubmitError::ConstraintViolation(field) => {
                ApiError::invalid("Invalid comment", field)
            }
            CommentSubmitError::Repo(repo) => repo.into(),
        }
    }
}
