use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::query_engine::QueryEngine;

use super::models::{ErrorResponse, HealthResponse, PageMatch, SearchRequest, SearchResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub async fn search_handler(
    State(query_engine): State<Arc<QueryEngine>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();

    let query = request.query.trim();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "empty query"));
    }
    if query_engine.is_empty() {
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "index not built or corpus missing",
        ));
    }

    let output = query_engine.search(query, request.top_k).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("search error: {e}"),
        )
    })?;

    let results = output
        .results
        .into_iter()
        .map(|(doc_key, hits)| {
            let matches = hits
                .into_iter()
                .map(|hit| PageMatch {
                    page_no: hit.page_no,
                    score: hit.score,
                    text_snippet: hit.text_snippet,
                    pdf_link: hit.pdf_link,
                })
                .collect::<Vec<PageMatch>>();
            (doc_key, matches)
        })
        .collect();

    tracing::debug!(
        query,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search served"
    );

    Ok(Json(SearchResponse {
        query: query.to_string(),
        summary: output.summary,
        results,
    }))
}

pub async fn health_handler(
    State(query_engine): State<Arc<QueryEngine>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        indexed_pages: query_engine.indexed_pages(),
    })
}
