//! Payment eligibility resolver.
//!
//! Combines a case's reservations with the upstream payment calculation and
//! answers what can currently be paid. "Upstream has no data" and "upstream
//! is down" both resolve to `None`: a payment must never be allowed on the
//! strength of missing figures, and read paths render "unknown" instead of
//! failing.

use crate::models::PaymentSummary;
use crate::services::giav::GiavClient;
use crate::services::normalizer::{first_bool, first_f64, first_str, PAID_EPSILON};
use serde_json::Value;

const TOTAL_FIELDS: &[&str] = &["Total", "total", "Importe", "importe"];
const PAID_FIELDS: &[&str] = &["Pagado", "pagado", "TotalPagado", "totalPagado"];
const REAL_PAID_FIELDS: &[&str] = &["PagadoReal", "pagadoReal", "pagado_real"];
const PENDING_FIELDS: &[&str] = &["Pendiente", "pendiente"];
const REAL_PENDING_FIELDS: &[&str] = &["PendienteReal", "pendienteReal", "pendiente_real"];
const DEPOSIT_FIELDS: &[&str] = &["Senal", "senal", "Deposito", "deposito"];
const IS_PAID_FIELDS: &[&str] = &["EstaPagado", "estaPagado", "esta_pagado"];
const CURRENCY_FIELDS: &[&str] = &["Moneda", "moneda", "Currency", "currency"];

/// What the caller may pay right now, per payment type.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentAction {
    pub allowed: bool,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentActions {
    pub deposit: PaymentAction,
    pub balance: PaymentAction,
}

/// Resolve the payment summary for a case, scoped to a customer.
///
/// `None` covers non-positive ids, cases without reservations or
/// calculation, and upstream failures (logged, then treated as no data).
pub async fn resolve(giav: &GiavClient, customer_id: i64, case_id: i64) -> Option<PaymentSummary> {
    if customer_id <= 0 || case_id <= 0 {
        return None;
    }

    let reservations = match giav.reservations_for_case(case_id, customer_id).await {
        Ok(Some(reservations)) => reservations,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(case_id, customer_id, %error, "reservations lookup unavailable");
            return None;
        }
    };

    let calc = match giav.calculate_payment(case_id, customer_id, &reservations).await {
        Ok(Some(calc)) => calc,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(case_id, customer_id, %error, "payment calculation unavailable");
            return None;
        }
    };

    Some(summary_from_calc(&calc))
}

/// Shape the loosely-typed calculation record into a summary.
///
/// Prefers "real" paid/pending figures over nominal ones, defaults every
/// missing number to zero, and clamps results to non-negative.
pub fn summary_from_calc(calc: &Value) -> PaymentSummary {
    let total = first_f64(calc, TOTAL_FIELDS).unwrap_or(0.0).max(0.0);

    let nominal_paid = first_f64(calc, PAID_FIELDS).unwrap_or(0.0);
    let paid = first_f64(calc, REAL_PAID_FIELDS)
        .unwrap_or(nominal_paid)
        .max(0.0);

    let derived_pending = (total - paid).max(0.0);
    let pending = first_f64(calc, REAL_PENDING_FIELDS)
        .or_else(|| first_f64(calc, PENDING_FIELDS))
        .unwrap_or(derived_pending)
        .max(0.0);

    let deposit = first_f64(calc, DEPOSIT_FIELDS).unwrap_or(0.0).max(0.0);

    let is_paid = first_bool(calc, IS_PAID_FIELDS).unwrap_or(false) || pending <= PAID_EPSILON;

    let currency = first_str(calc, CURRENCY_FIELDS).unwrap_or_else(|| "EUR".to_string());

    PaymentSummary {
        total,
        paid,
        pending,
        deposit,
        is_paid,
        currency,
    }
}

/// Derive the per-type actions from a resolved summary.
///
/// Deposit stays payable while the requested deposit exceeds what has been
/// paid; its amount is the remaining deposit, capped at the pending total.
/// Balance is payable while anything is pending.
pub fn actions_for(summary: Option<&PaymentSummary>) -> PaymentActions {
    let Some(summary) = summary else {
        return PaymentActions::default();
    };

    let deposit_remaining = (summary.deposit - summary.paid).max(0.0);
    let deposit = PaymentAction {
        allowed: !summary.is_paid && summary.deposit > 0.0 && deposit_remaining > PAID_EPSILON,
        amount: deposit_remaining.min(summary.pending),
    };

    let balance = PaymentAction {
        allowed: summary.pending > PAID_EPSILON,
        amount: summary.pending,
    };

    PaymentActions { deposit, balance }
}
