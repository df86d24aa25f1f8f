use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::templates;

/// Storage failures, classified so handlers can react to the recoverable ones.
#[derive(Error, Debug)]
pub enum DbError {
    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation { constraint: Option<String> },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation { constraint: Option<String> },

    /// Connectivity loss, malformed rows and everything else
    #[error(transparent)]
    Other(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().map(str::to_string);
            if db_err.is_unique_violation() {
                return DbError::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                return DbError::ForeignKeyViolation { constraint };
            }
        }
        DbError::Other(err)
    }
}

/// Every failure a handler can end with. Recoverable user mistakes never reach this type;
/// they are turned into flash messages and redirects inside the handler.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("session encoding failed: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(DbError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            AppError::Database(DbError::ForeignKeyViolation { .. }) => StatusCode::BAD_REQUEST,
            AppError::Database(DbError::Other(_))
            | AppError::Password(_)
            | AppError::Session(_)
            | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show on the error page.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound { resource, .. } => format!("{resource} not found"),
            AppError::Database(DbError::UniqueViolation { .. }) => {
                "That record already exists".to_string()
            }
            AppError::Database(DbError::ForeignKeyViolation { .. }) => {
                "That refers to something that does not exist".to_string()
            }
            _ => "Something went wrong on our side".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound { .. } => tracing::debug!("Client error: {}", self),
            AppError::Database(DbError::UniqueViolation { .. })
            | AppError::Database(DbError::ForeignKeyViolation { .. }) => {
                tracing::warn!("Database constraint error: {}", self)
            }
            _ => tracing::error!("Internal error: {:#}", self),
        }

        let status = self.status_code();
        let message = self.user_message();

        match templates::render_error(status, &message) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(e) => {
                tracing::error!("error page failed to render: {e}");
                (status, message).into_response()
            }
        }
    }
}
