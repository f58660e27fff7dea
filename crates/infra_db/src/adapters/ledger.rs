//! PostgreSQL implementation of the billing ledger store
//!
//! Each atomic unit from the port contract is one database transaction
//! bounded by a statement timeout. The submission unit is guarded by a
//! compare-and-swap on `customers.last_reading`, so two racing submissions
//! for the same meter can never both commit from the same baseline.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use core_kernel::{
    BillId, BillingPeriod, Currency, CustomerId, DomainPort, MeterNumber, Money, PaymentId,
    PortError, ReadingId, UnitRate,
};
use domain_billing::ports::LedgerStore;
use domain_billing::{
    Bill, BillStatus, Customer, MeterReading, Payment, PaymentMethod, PaymentStatus,
    ReadingMethod,
};

use crate::error::map_sqlx;

/// PostgreSQL-backed `LedgerStore`
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
    transaction_timeout: Duration,
}

impl PostgresLedgerStore {
    /// Creates a store over the given connection pool with the default
    /// 10-second transaction deadline
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            transaction_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the per-transaction deadline
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Applies the bounded deadline to the current transaction
    ///
    /// `SET LOCAL` scopes the timeout to the transaction, so an aborted
    /// unit leaves the session untouched.
    async fn apply_deadline(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), PortError> {
        let statement = format!(
            "SET LOCAL statement_timeout = {}",
            self.transaction_timeout.as_millis()
        );
        sqlx::query(&statement)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                customer_id, meter_number, full_name, phone, zone,
                rate_per_unit, currency, fixed_charge,
                last_reading, last_reading_date,
                balance, total_consumed, total_paid,
                is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(Uuid::from(customer.id))
        .bind(customer.meter_number.as_str())
        .bind(&customer.full_name)
        .bind(&customer.phone)
        .bind(&customer.zone)
        .bind(customer.rate_per_unit.per_unit())
        .bind(customer.rate_per_unit.currency().code())
        .bind(customer.fixed_charge.amount())
        .bind(customer.last_reading)
        .bind(customer.last_reading_date)
        .bind(customer.balance.amount())
        .bind(customer.total_consumed)
        .bind(customer.total_paid.amount())
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn customer_by_meter(&self, meter_number: &MeterNumber) -> Result<Customer, PortError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT customer_id, meter_number, full_name, phone, zone,
                   rate_per_unit, currency, fixed_charge,
                   last_reading, last_reading_date,
                   balance, total_consumed, total_paid,
                   is_active, created_at, updated_at
            FROM customers
            WHERE meter_number = $1
            "#,
        )
        .bind(meter_number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| PortError::not_found("Customer", meter_number))?
            .into_domain()
    }

    async fn latest_reading(
        &self,
        meter_number: &MeterNumber,
    ) -> Result<Option<MeterReading>, PortError> {
        let row: Option<ReadingRow> = sqlx::query_as(
            r#"
            SELECT reading_id, meter_number, previous_reading, current_reading,
                   consumption, rate_per_unit, water_charge, currency,
                   billing_period, read_by, method, reading_date, recorded_at
            FROM meter_readings
            WHERE meter_number = $1
            ORDER BY recorded_at DESC, reading_id DESC
            LIMIT 1
            "#,
        )
        .bind(meter_number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn bill_by_id(&self, id: BillId) -> Result<Bill, PortError> {
        let row: Option<BillRow> = sqlx::query_as(BILL_SELECT)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.ok_or_else(|| PortError::not_found("Bill", id))?
            .into_domain()
    }

    async fn payments_for_bill(&self, id: BillId) -> Result<Vec<Payment>, PortError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT payment_id, bill_id, meter_number, amount, currency, method,
                   transaction_reference, receipt_number, collected_by,
                   status, paid_at, created_at
            FROM payments
            WHERE bill_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn record_submission(
        &self,
        reading: &MeterReading,
        bill: &Bill,
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        self.apply_deadline(&mut tx).await?;

        // Compare-and-swap on the customer's meter position. Zero rows
        // means either the customer vanished or another submission moved
        // last_reading; both abort the whole unit.
        let balance_delta = bill.arrears.amount() - bill.total_amount.amount();
        let updated = sqlx::query(
            r#"
            UPDATE customers
            SET last_reading = $1,
                last_reading_date = $2,
                total_consumed = total_consumed + $3,
                balance = balance + $4,
                updated_at = $5
            WHERE meter_number = $6 AND last_reading = $7
            "#,
        )
        .bind(reading.current_reading)
        .bind(reading.reading_date)
        .bind(reading.consumption)
        .bind(balance_delta)
        .bind(Utc::now())
        .bind(reading.meter_number.as_str())
        .bind(reading.previous_reading)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if updated.rows_affected() == 0 {
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT customer_id FROM customers WHERE meter_number = $1")
                    .bind(reading.meter_number.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx)?;
            tx.rollback().await.ok();

            return Err(match exists {
                Some(_) => PortError::conflict(format!(
                    "last_reading for meter {} moved past {}",
                    reading.meter_number, reading.previous_reading
                )),
                None => PortError::not_found("Customer", &reading.meter_number),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO meter_readings (
                reading_id, meter_number, previous_reading, current_reading,
                consumption, rate_per_unit, water_charge, currency,
                billing_period, read_by, method, reading_date, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::from(reading.id))
        .bind(reading.meter_number.as_str())
        .bind(reading.previous_reading)
        .bind(reading.current_reading)
        .bind(reading.consumption)
        .bind(reading.rate_applied.per_unit())
        .bind(reading.water_charge.amount())
        .bind(reading.water_charge.currency().code())
        .bind(reading.billing_period.label())
        .bind(&reading.read_by)
        .bind(reading_method_str(reading.method))
        .bind(reading.reading_date)
        .bind(reading.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                bill_id, bill_number, reading_id, customer_id, meter_number,
                billing_period, previous_reading, current_reading, consumption,
                water_charge, arrears, total_amount, amount_paid, balance,
                currency, status, bill_date, due_date,
                notification_sent, notification_sent_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                      $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(Uuid::from(bill.id))
        .bind(&bill.bill_number)
        .bind(Uuid::from(bill.reading_id))
        .bind(Uuid::from(bill.customer_id))
        .bind(bill.meter_number.as_str())
        .bind(bill.billing_period.label())
        .bind(bill.previous_reading)
        .bind(bill.current_reading)
        .bind(bill.consumption)
        .bind(bill.water_charge.amount())
        .bind(bill.arrears.amount())
        .bind(bill.total_amount.amount())
        .bind(bill.amount_paid.amount())
        .bind(bill.balance.amount())
        .bind(bill.total_amount.currency().code())
        .bind(bill_status_str(bill.status))
        .bind(bill.bill_date)
        .bind(bill.due_date)
        .bind(bill.notification_sent)
        .bind(bill.notification_sent_at)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)
    }

    async fn record_payment(&self, payment: &Payment) -> Result<Bill, PortError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        self.apply_deadline(&mut tx).await?;

        let amount = payment.amount.amount();
        let now = Utc::now();

        let row: Option<BillRow> = sqlx::query_as(
            r#"
            UPDATE bills
            SET amount_paid = amount_paid + $1,
                balance = total_amount - (amount_paid + $1),
                status = CASE
                    WHEN total_amount - (amount_paid + $1) <= 0 THEN 'paid'
                    ELSE 'partially_paid'
                END,
                updated_at = $2
            WHERE bill_id = $3
            RETURNING bill_id, bill_number, reading_id, customer_id, meter_number,
                      billing_period, previous_reading, current_reading, consumption,
                      water_charge, arrears, total_amount, amount_paid, balance,
                      currency, status, bill_date, due_date,
                      notification_sent, notification_sent_at, created_at, updated_at
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(Uuid::from(payment.bill_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            tx.rollback().await.ok();
            return Err(PortError::not_found("Bill", payment.bill_id));
        };

        let updated = sqlx::query(
            r#"
            UPDATE customers
            SET balance = balance + $1,
                total_paid = total_paid + $1,
                updated_at = $2
            WHERE meter_number = $3
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(payment.meter_number.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(PortError::not_found("Customer", &payment.meter_number));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, bill_id, meter_number, amount, currency, method,
                transaction_reference, receipt_number, collected_by,
                status, paid_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(payment.bill_id))
        .bind(payment.meter_number.as_str())
        .bind(amount)
        .bind(payment.amount.currency().code())
        .bind(payment_method_str(payment.method))
        .bind(&payment.transaction_reference)
        .bind(&payment.receipt_number)
        .bind(&payment.collected_by)
        .bind(payment_status_str(payment.status))
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        row.into_domain()
    }

    async fn mark_bill_notified(
        &self,
        bill_id: BillId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let updated = sqlx::query(
            r#"
            UPDATE bills
            SET notification_sent = TRUE,
                notification_sent_at = $1,
                updated_at = $2
            WHERE bill_id = $3
            "#,
        )
        .bind(sent_at)
        .bind(Utc::now())
        .bind(Uuid::from(bill_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if updated.rows_affected() == 0 {
            return Err(PortError::not_found("Bill", bill_id));
        }
        Ok(())
    }
}

const BILL_SELECT: &str = r#"
    SELECT bill_id, bill_number, reading_id, customer_id, meter_number,
           billing_period, previous_reading, current_reading, consumption,
           water_charge, arrears, total_amount, amount_paid, balance,
           currency, status, bill_date, due_date,
           notification_sent, notification_sent_at, created_at, updated_at
    FROM bills
    WHERE bill_id = $1
"#;

fn reading_method_str(method: ReadingMethod) -> &'static str {
    match method {
        ReadingMethod::Manual => "manual",
        ReadingMethod::SelfReported => "self_reported",
        ReadingMethod::Estimated => "estimated",
    }
}

fn parse_reading_method(raw: &str) -> Result<ReadingMethod, PortError> {
    match raw {
        "manual" => Ok(ReadingMethod::Manual),
        "self_reported" => Ok(ReadingMethod::SelfReported),
        "estimated" => Ok(ReadingMethod::Estimated),
        other => Err(PortError::internal(format!(
            "Unknown reading method in database: {other}"
        ))),
    }
}

fn bill_status_str(status: BillStatus) -> &'static str {
    match status {
        BillStatus::Pending => "pending",
        BillStatus::PartiallyPaid => "partially_paid",
        BillStatus::Paid => "paid",
        BillStatus::Overdue => "overdue",
    }
}

fn parse_bill_status(raw: &str) -> Result<BillStatus, PortError> {
    match raw {
        "pending" => Ok(BillStatus::Pending),
        "partially_paid" => Ok(BillStatus::PartiallyPaid),
        "paid" => Ok(BillStatus::Paid),
        "overdue" => Ok(BillStatus::Overdue),
        other => Err(PortError::internal(format!(
            "Unknown bill status in database: {other}"
        ))),
    }
}

fn payment_method_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::MobileMoney => "mobile_money",
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::Cheque => "cheque",
        PaymentMethod::Card => "card",
    }
}

fn parse_payment_method(raw: &str) -> Result<PaymentMethod, PortError> {
    match raw {
        "cash" => Ok(PaymentMethod::Cash),
        "mobile_money" => Ok(PaymentMethod::MobileMoney),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "cheque" => Ok(PaymentMethod::Cheque),
        "card" => Ok(PaymentMethod::Card),
        other => Err(PortError::internal(format!(
            "Unknown payment method in database: {other}"
        ))),
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Completed => "completed",
        PaymentStatus::Reversed => "reversed",
    }
}

fn parse_payment_status(raw: &str) -> Result<PaymentStatus, PortError> {
    match raw {
        "completed" => Ok(PaymentStatus::Completed),
        "reversed" => Ok(PaymentStatus::Reversed),
        other => Err(PortError::internal(format!(
            "Unknown payment status in database: {other}"
        ))),
    }
}

fn parse_currency(raw: &str) -> Result<Currency, PortError> {
    raw.parse()
        .map_err(|_| PortError::internal(format!("Unknown currency in database: {raw}")))
}

fn parse_meter_number(raw: &str) -> Result<MeterNumber, PortError> {
    MeterNumber::new(raw)
        .map_err(|e| PortError::internal(format!("Invalid meter number in database: {e}")))
}

fn parse_period(raw: &str) -> Result<BillingPeriod, PortError> {
    raw.trim()
        .parse()
        .map_err(|_| PortError::internal(format!("Invalid billing period in database: {raw}")))
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    customer_id: Uuid,
    meter_number: String,
    full_name: String,
    phone: String,
    zone: Option<String>,
    rate_per_unit: Decimal,
    currency: String,
    fixed_charge: Decimal,
    last_reading: Decimal,
    last_reading_date: Option<DateTime<Utc>>,
    balance: Decimal,
    total_consumed: Decimal,
    total_paid: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_domain(self) -> Result<Customer, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Customer {
            id: CustomerId::from(self.customer_id),
            meter_number: parse_meter_number(&self.meter_number)?,
            full_name: self.full_name,
            phone: self.phone,
            zone: self.zone,
            rate_per_unit: UnitRate::new(self.rate_per_unit, currency),
            fixed_charge: Money::new(self.fixed_charge, currency),
            last_reading: self.last_reading,
            last_reading_date: self.last_reading_date,
            balance: Money::new(self.balance, currency),
            total_consumed: self.total_consumed,
            total_paid: Money::new(self.total_paid, currency),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    reading_id: Uuid,
    meter_number: String,
    previous_reading: Decimal,
    current_reading: Decimal,
    consumption: Decimal,
    rate_per_unit: Decimal,
    water_charge: Decimal,
    currency: String,
    billing_period: String,
    read_by: String,
    method: String,
    reading_date: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
}

impl ReadingRow {
    fn into_domain(self) -> Result<MeterReading, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(MeterReading {
            id: ReadingId::from(self.reading_id),
            meter_number: parse_meter_number(&self.meter_number)?,
            previous_reading: self.previous_reading,
            current_reading: self.current_reading,
            consumption: self.consumption,
            rate_applied: UnitRate::new(self.rate_per_unit, currency),
            water_charge: Money::new(self.water_charge, currency),
            billing_period: parse_period(&self.billing_period)?,
            read_by: self.read_by,
            method: parse_reading_method(&self.method)?,
            reading_date: self.reading_date,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    bill_id: Uuid,
    bill_number: String,
    reading_id: Uuid,
    customer_id: Uuid,
    meter_number: String,
    billing_period: String,
    previous_reading: Decimal,
    current_reading: Decimal,
    consumption: Decimal,
    water_charge: Decimal,
    arrears: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    balance: Decimal,
    currency: String,
    status: String,
    bill_date: NaiveDate,
    due_date: NaiveDate,
    notification_sent: bool,
    notification_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BillRow {
    fn into_domain(self) -> Result<Bill, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Bill {
            id: BillId::from(self.bill_id),
            bill_number: self.bill_number,
            reading_id: ReadingId::from(self.reading_id),
            customer_id: CustomerId::from(self.customer_id),
            meter_number: parse_meter_number(&self.meter_number)?,
            billing_period: parse_period(&self.billing_period)?,
            previous_reading: self.previous_reading,
            current_reading: self.current_reading,
            consumption: self.consumption,
            water_charge: Money::new(self.water_charge, currency),
            arrears: Money::new(self.arrears, currency),
            total_amount: Money::new(self.total_amount, currency),
            amount_paid: Money::new(self.amount_paid, currency),
            balance: Money::new(self.balance, currency),
            status: parse_bill_status(&self.status)?,
            bill_date: self.bill_date,
            due_date: self.due_date,
            notification_sent: self.notification_sent,
            notification_sent_at: self.notification_sent_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    bill_id: Uuid,
    meter_number: String,
    amount: Decimal,
    currency: String,
    method: String,
    transaction_reference: Option<String>,
    receipt_number: String,
    collected_by: String,
    status: String,
    paid_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Payment {
            id: PaymentId::from(self.payment_id),
            bill_id: BillId::from(self.bill_id),
            meter_number: parse_meter_number(&self.meter_number)?,
            amount: Money::new(self.amount, currency),
            method: parse_payment_method(&self.method)?,
            transaction_reference: self.transaction_reference,
            receipt_number: self.receipt_number,
            collected_by: self.collected_by,
            status: parse_payment_status(&self.status)?,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}
