//! Search handler

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use aqar_common::{errors::AppError, search::Language};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// `en` (default) or `ar`
    #[serde(default)]
    pub language: Option<String>,
}

/// Run one natural-language property search.
///
/// Failures are rendered in the requested language; upstream details stay
/// in the logs.
pub async fn search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    let language = match request.language.as_deref() {
        None => Language::default(),
        Some(raw) => match raw.parse::<Language>() {
            Ok(language) => language,
            Err(e) => return e.into_response(),
        },
    };

    if let Err(e) = request.validate() {
        return AppError::Validation {
            message: e.to_string(),
            field: Some("query".to_string()),
        }
        .into_localized_response(language);
    }

    match state.pipeline.search(&request.query, language).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_localized_response(language),
    }
}
