use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::donation::{
    CreateDonationRequest, CreatedBy, Donation, DonationCategory, DonationStatus, PaymentMethod,
};
use crate::domain::result::CallbackResult;
use crate::gateways::GatewayKind;
use crate::repo::receipt_outbox_repo::ReceiptOutboxRepo;

const DONATION_COLUMNS: &str = r#"
    id, donation_type, amount, donor_name, phone, email, prayer, notes, needs_receipt,
    status, payment_method, paid_at, gateway_name, merchant_trade_no,
    gateway_trade_no, gateway_rtn_code, gateway_rtn_msg,
    atm_bank_code, atm_v_account, cvs_payment_no,
    cvs_barcode_1, cvs_barcode_2, cvs_barcode_3, payment_expire_date
"#;

#[derive(Clone)]
pub struct DonationsRepo {
    pub pool: PgPool,
}

impl DonationsRepo {
    pub async fn insert(&self, req: &CreateDonationRequest, created_by: CreatedBy) -> Result<Donation> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO donations (donation_type, amount, donor_name, phone, email, prayer, notes, needs_receipt, payment_method, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {DONATION_COLUMNS}
            "#,
        ))
        .bind(req.donation_type.as_str())
        .bind(req.amount)
        .bind(req.donor_name.trim())
        .bind(req.phone.clone())
        .bind(req.email.clone())
        .bind(req.prayer.clone())
        .bind(req.notes.clone())
        .bind(req.needs_receipt)
        .bind(req.payment_method.map(|m| m.as_str()))
        .bind(created_by.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_donation(&row)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!("SELECT {DONATION_COLUMNS} FROM donations WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    pub async fn find_by_merchant_trade_no(&self, trade_no: &str) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE merchant_trade_no = $1"
        ))
        .bind(trade_no)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    /// Record the checkout pinning. The gateway is set once and never
    /// overwritten; the merchant trade number is refreshed on every checkout
    /// attempt (a retry gets a fresh number).
    pub async fn pin_checkout(&self, id: i64, gateway: GatewayKind, trade_no: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE donations
            SET gateway_name = COALESCE(gateway_name, $2), merchant_trade_no = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(gateway.as_str())
        .bind(trade_no)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Transition to `paid`, copying the canonical result fields. The status
    /// guard in the WHERE clause makes concurrent re-deliveries race safely:
    /// only the delivery that actually flips the row enqueues the receipt
    /// email, so the side effect fires at most once.
    ///
    /// Returns whether this call performed the transition.
    pub async fn mark_paid(&self, donation: &Donation, result: &CallbackResult) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE donations
            SET status = 'paid',
                paid_at = now(),
                gateway_trade_no = COALESCE($2, gateway_trade_no),
                gateway_rtn_code = COALESCE($3, gateway_rtn_code),
                gateway_rtn_msg = COALESCE($4, gateway_rtn_msg),
                gateway_payment_type = COALESCE($5, gateway_payment_type),
                gateway_payment_date = COALESCE($6, gateway_payment_date),
                gateway_trade_amt = COALESCE($7, gateway_trade_amt),
                gateway_simulate_paid = $8,
                atm_bank_code = COALESCE($9, atm_bank_code),
                atm_v_account = COALESCE($10, atm_v_account),
                cvs_payment_no = COALESCE($11, cvs_payment_no),
                cvs_barcode_1 = COALESCE($12, cvs_barcode_1),
                cvs_barcode_2 = COALESCE($13, cvs_barcode_2),
                cvs_barcode_3 = COALESCE($14, cvs_barcode_3),
                updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'awaiting_payment')
            "#,
        )
        .bind(donation.id)
        .bind(result.gateway_trade_no.clone())
        .bind(result.rtn_code.clone())
        .bind(result.rtn_msg.clone())
        .bind(result.payment_type.clone())
        .bind(result.payment_date)
        .bind(result.trade_amt)
        .bind(result.simulate_paid)
        .bind(result.bank_code.clone())
        .bind(result.v_account.clone())
        .bind(result.payment_no.clone())
        .bind(result.barcode_1.clone())
        .bind(result.barcode_2.clone())
        .bind(result.barcode_3.clone())
        .execute(tx.as_mut())
        .await?
        .rows_affected();

        let newly_paid = updated == 1;
        if newly_paid {
            self.enqueue_receipt_tx(&mut tx, donation).await?;
        }

        tx.commit().await?;
        Ok(newly_paid)
    }

    /// Transition to `awaiting_payment` with the issued payment details.
    /// Never touches `paid_at`, never downgrades a paid donation.
    pub async fn save_payment_info(&self, id: i64, result: &CallbackResult) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE donations
            SET status = 'awaiting_payment',
                gateway_trade_no = COALESCE($2, gateway_trade_no),
                gateway_rtn_code = COALESCE($3, gateway_rtn_code),
                gateway_rtn_msg = COALESCE($4, gateway_rtn_msg),
                gateway_trade_amt = COALESCE($5, gateway_trade_amt),
                atm_bank_code = COALESCE($6, atm_bank_code),
                atm_v_account = COALESCE($7, atm_v_account),
                cvs_payment_no = COALESCE($8, cvs_payment_no),
                cvs_barcode_1 = COALESCE($9, cvs_barcode_1),
                cvs_barcode_2 = COALESCE($10, cvs_barcode_2),
                cvs_barcode_3 = COALESCE($11, cvs_barcode_3),
                payment_expire_date = COALESCE($12, payment_expire_date),
                updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'awaiting_payment')
            "#,
        )
        .bind(id)
        .bind(result.gateway_trade_no.clone())
        .bind(result.rtn_code.clone())
        .bind(result.rtn_msg.clone())
        .bind(result.trade_amt)
        .bind(result.bank_code.clone())
        .bind(result.v_account.clone())
        .bind(result.payment_no.clone())
        .bind(result.barcode_1.clone())
        .bind(result.barcode_2.clone())
        .bind(result.barcode_3.clone())
        .bind(result.expire_date)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    /// Administrative override: same transition as `mark_paid` but with no
    /// gateway correlation fields to copy.
    pub async fn manual_mark_paid(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE donations
            SET status = 'paid', paid_at = now(), updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'awaiting_payment')
            RETURNING {DONATION_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(tx.as_mut())
        .await?;

        let newly_paid = match row.as_ref().map(row_to_donation).transpose()? {
            Some(donation) => {
                self.enqueue_receipt_tx(&mut tx, &donation).await?;
                true
            }
            None => false,
        };

        tx.commit().await?;
        Ok(newly_paid)
    }

    pub async fn cancel(&self, id: i64) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE donations
            SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'awaiting_payment')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn enqueue_receipt_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        donation: &Donation,
    ) -> Result<()> {
        if !donation.needs_receipt {
            return Ok(());
        }
        let Some(email) = donation.email.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(());
        };

        let payload = serde_json::json!({
            "donation_id": donation.id,
            "email": email,
            "donor_name": donation.donor_name,
            "amount": donation.amount,
            "donation_type": donation.donation_type.as_str(),
        });

        ReceiptOutboxRepo::insert_tx(tx, donation.id, "donation.receipt_requested", payload).await
    }
}

fn row_to_donation(r: &PgRow) -> Result<Donation> {
    let donation_type: String = r.get("donation_type");
    let status: String = r.get("status");
    let payment_method: Option<String> = r.get("payment_method");

    Ok(Donation {
        id: r.get("id"),
        donation_type: DonationCategory::parse(&donation_type)
            .ok_or_else(|| anyhow!("unknown donation_type in db: {donation_type}"))?,
        amount: r.get("amount"),
        donor_name: r.get("donor_name"),
        phone: r.get("phone"),
        email: r.get("email"),
        prayer: r.get("prayer"),
        notes: r.get("notes"),
        needs_receipt: r.get("needs_receipt"),
        status: DonationStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown status in db: {status}"))?,
        payment_method: payment_method
            .map(|m| PaymentMethod::parse(&m).ok_or_else(|| anyhow!("unknown payment_method in db: {m}")))
            .transpose()?,
        paid_at: r.get("paid_at"),
        gateway_name: r.get("gateway_name"),
        merchant_trade_no: r.get("merchant_trade_no"),
        gateway_trade_no: r.get("gateway_trade_no"),
        gateway_rtn_code: r.get("gateway_rtn_code"),
        gateway_rtn_msg: r.get("gateway_rtn_msg"),
        atm_bank_code: r.get("atm_bank_code"),
        atm_v_account: r.get("atm_v_account"),
        cvs_payment_no: r.get("cvs_payment_no"),
        cvs_barcode_1: r.get("cvs_barcode_1"),
        cvs_barcode_2: r.get("cvs_barcode_2"),
        cvs_barcode_3: r.get("cvs_barcode_3"),
        payment_expire_date: r.get("payment_expire_date"),
    })
}
