//! Billing handlers
//!
//! Thin translation from HTTP to engine calls; no billing logic lives
//! here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillId, MeterNumber};
use domain_billing::{ReadingMethod, RecordPayment, SubmitReading};

use crate::dto::billing::{
    BillResponse, PaymentResponse, RecordPaymentRequest, SubmitReadingRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// Submits a meter reading and returns the generated bill
pub async fn submit_reading(
    State(state): State<AppState>,
    Json(request): Json<SubmitReadingRequest>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    request.validate()?;

    let meter_number = MeterNumber::new(&request.meter_number)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let bill = state
        .engine
        .submit_reading(SubmitReading {
            meter_number,
            current_reading: request.current_reading.round_dp(2),
            reading_date: request.reading_date.unwrap_or_else(Utc::now),
            read_by: request.read_by,
            method: request.method.unwrap_or(ReadingMethod::Manual),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(bill.into())))
}

/// Records a payment and returns the confirmation with receipt number
pub async fn record_payment(
    State(state): State<AppState>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    request.validate()?;

    let payment = state
        .engine
        .record_payment(RecordPayment {
            bill_id: BillId::from(request.bill_id),
            amount: request.amount.round_dp(2),
            method: request.method,
            transaction_reference: request.transaction_reference,
            receipt_number: request.receipt_number,
            collected_by: request.collected_by,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// Gets a bill by id
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state.engine.bill(BillId::from(id)).await?;
    Ok(Json(bill.into()))
}

/// Lists payments recorded against a bill
pub async fn list_bill_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.engine.payments(BillId::from(id)).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
