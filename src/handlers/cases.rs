//! Case ("expediente") listing.
//!
//! Read path policy: upstream failures never surface as 5xx. The client
//! always receives a structurally complete payload; a degraded envelope
//! carries the raw error string so operators can diagnose from the client
//! side while the UI keeps rendering.

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    dtos::CaseListResponse,
    error::PortalError,
    middleware::CustomerContext,
    models::NormalizedCase,
    services::{eligibility, normalizer},
    AppState,
};

pub async fn list_cases(
    State(state): State<AppState>,
    customer: CustomerContext,
) -> Result<Json<CaseListResponse>, PortalError> {
    if customer.customer_id <= 0 {
        return Err(PortalError::NoClient);
    }

    match build_case_list(&state, customer.customer_id).await {
        Ok(cases) => Ok(Json(CaseListResponse::ok(cases))),
        Err(error) => {
            tracing::error!(
                customer_id = customer.customer_id,
                %error,
                "case listing degraded"
            );
            Ok(Json(CaseListResponse::degraded(error.to_string())))
        }
    }
}

async fn build_case_list(
    state: &AppState,
    customer_id: i64,
) -> anyhow::Result<Vec<NormalizedCase>> {
    let raw_cases: Vec<Value> = state.giav.cases_for_customer(customer_id).await?;

    // Stage names only feed the status fallback; an empty table just leaves
    // unknown statuses empty.
    let stage_names = match state.giav.stage_names("expediente").await {
        Ok(names) => names,
        Err(error) => {
            tracing::warn!(%error, "stage names unavailable");
            Default::default()
        }
    };

    let mut cases = Vec::with_capacity(raw_cases.len());
    for raw in &raw_cases {
        let case_id = normalizer::case_id(raw);
        let summary = eligibility::resolve(&state.giav, customer_id, case_id).await;
        cases.push(normalizer::normalize_case(raw, summary.as_ref(), &stage_names));
    }

    Ok(cases)
}
