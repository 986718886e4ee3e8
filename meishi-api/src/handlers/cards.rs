use actix_web::{web, HttpResponse, Result as ActixResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use shared_types::{ReconcileRequest, ReconcileResponse, ResumeRequest, ScanRequest};
use std::sync::Arc;

use crate::database::Database;
use crate::integrations::openai::OpenAiVisionClient;
use crate::reconcile::{self, ReconcileError, ReconcileOutcome, SqliteContactStore};

/// Extract cards from uploaded images, then reconcile the batch. A
/// `Suspended` response carries the duplicates and the state the client
/// must echo back on resume.
pub async fn scan_cards(
    db: web::Data<Arc<Database>>,
    vision: web::Data<Arc<OpenAiVisionClient>>,
    request: web::Json<ScanRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();

    let mut images = Vec::with_capacity(request.images.len());
    for image in request.images {
        let bytes = BASE64.decode(image.data.as_bytes()).map_err(|e| {
            actix_web::error::ErrorBadRequest(format!(
                "image {} is not valid base64: {}",
                image.filename, e
            ))
        })?;
        images.push((image.filename, bytes));
    }

    let cards = vision.extract_cards(&images).await;

    let store = SqliteContactStore::new(db.async_connection.clone());
    let outcome = reconcile::invoke(&store, cards)
        .await
        .map_err(reconcile_error_response)?;

    Ok(HttpResponse::Ok().json(outcome_response(outcome)))
}

/// Reconcile a batch of already-extracted cards.
pub async fn reconcile_cards(
    db: web::Data<Arc<Database>>,
    request: web::Json<ReconcileRequest>,
) -> ActixResult<HttpResponse> {
    let store = SqliteContactStore::new(db.async_connection.clone());
    let outcome = reconcile::invoke(&store, request.into_inner().cards)
        .await
        .map_err(reconcile_error_response)?;

    Ok(HttpResponse::Ok().json(outcome_response(outcome)))
}

/// Resume a suspended reconciliation with the human's decisions.
pub async fn resume_reconciliation(
    db: web::Data<Arc<Database>>,
    request: web::Json<ResumeRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();

    let store = SqliteContactStore::new(db.async_connection.clone());
    let outcome = reconcile::resume(&store, request.state, request.decisions)
        .await
        .map_err(reconcile_error_response)?;

    Ok(HttpResponse::Ok().json(outcome_response(outcome)))
}

fn outcome_response(outcome: ReconcileOutcome) -> ReconcileResponse {
    ReconcileResponse {
        state: outcome.state,
        commit_failures: outcome.commit_failures,
    }
}

fn reconcile_error_response(err: ReconcileError) -> actix_web::Error {
    match &err {
        ReconcileError::DecisionRequired { .. } => {
            actix_web::error::ErrorUnprocessableEntity(err.to_string())
        }
        ReconcileError::NotSuspended { .. } => actix_web::error::ErrorConflict(err.to_string()),
        ReconcileError::Store(_) => actix_web::error::ErrorInternalServerError(err.to_string()),
    }
}
