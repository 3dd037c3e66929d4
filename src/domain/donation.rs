use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationCategory {
    LightPeace,
    LightBright,
    LightTai,
    Incense,
    Merit,
    Construction,
}

impl DonationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationCategory::LightPeace => "light_peace",
            DonationCategory::LightBright => "light_bright",
            DonationCategory::LightTai => "light_tai",
            DonationCategory::Incense => "incense",
            DonationCategory::Merit => "merit",
            DonationCategory::Construction => "construction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light_peace" => Some(DonationCategory::LightPeace),
            "light_bright" => Some(DonationCategory::LightBright),
            "light_tai" => Some(DonationCategory::LightTai),
            "incense" => Some(DonationCategory::Incense),
            "merit" => Some(DonationCategory::Merit),
            "construction" => Some(DonationCategory::Construction),
            _ => None,
        }
    }

    // Shown on the processor's checkout page, so these stay in Chinese.
    pub fn display_name(&self) -> &'static str {
        match self {
            DonationCategory::LightPeace => "平安燈",
            DonationCategory::LightBright => "光明燈",
            DonationCategory::LightTai => "太歲燈",
            DonationCategory::Incense => "香油錢",
            DonationCategory::Merit => "功德金",
            DonationCategory::Construction => "建設基金",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    CvsBarcode,
    CvsCode,
    VirtualAccount,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::CvsBarcode => "cvs_barcode",
            PaymentMethod::CvsCode => "cvs_code",
            PaymentMethod::VirtualAccount => "virtual_account",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit_card" => Some(PaymentMethod::CreditCard),
            "cvs_barcode" => Some(PaymentMethod::CvsBarcode),
            "cvs_code" => Some(PaymentMethod::CvsCode),
            "virtual_account" => Some(PaymentMethod::VirtualAccount),
            _ => None,
        }
    }

    /// Methods where the user receives a code/account first and pays later.
    pub fn is_delayed_settlement(&self) -> bool {
        !matches!(self, PaymentMethod::CreditCard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    AwaitingPayment,
    Paid,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::AwaitingPayment => "awaiting_payment",
            DonationStatus::Paid => "paid",
            DonationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "awaiting_payment" => Some(DonationStatus::AwaitingPayment),
            "paid" => Some(DonationStatus::Paid),
            "cancelled" => Some(DonationStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Paid | DonationStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBy {
    Frontend,
    Admin,
}

impl CreatedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatedBy::Frontend => "frontend",
            CreatedBy::Admin => "admin",
        }
    }
}

/// A donation record. Financial history: rows are never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Donation {
    pub id: i64,
    pub donation_type: DonationCategory,
    pub amount: i64,
    pub donor_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub prayer: Option<String>,
    pub notes: Option<String>,
    pub needs_receipt: bool,
    pub status: DonationStatus,
    pub payment_method: Option<PaymentMethod>,
    pub paid_at: Option<DateTime<Utc>>,
    pub gateway_name: Option<String>,
    pub merchant_trade_no: Option<String>,
    pub gateway_trade_no: Option<String>,
    pub gateway_rtn_code: Option<String>,
    pub gateway_rtn_msg: Option<String>,
    pub atm_bank_code: Option<String>,
    pub atm_v_account: Option<String>,
    pub cvs_payment_no: Option<String>,
    pub cvs_barcode_1: Option<String>,
    pub cvs_barcode_2: Option<String>,
    pub cvs_barcode_3: Option<String>,
    pub payment_expire_date: Option<NaiveDateTime>,
}

impl Donation {
    /// Human-readable summary of issued payment details, for the result page.
    pub fn payment_info_summary(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let (Some(bank), Some(account)) = (&self.atm_bank_code, &self.atm_v_account) {
            parts.push(format!("銀行代碼 {bank}，虛擬帳號 {account}"));
        }
        if let Some(code) = &self.cvs_payment_no {
            parts.push(format!("超商繳費代碼 {code}"));
        }
        if self.cvs_barcode_1.is_some() {
            parts.push("繳費條碼已寄送".to_string());
        }
        if let Some(expire) = self.payment_expire_date {
            parts.push(format!("繳費期限 {}", expire.format("%Y-%m-%d %H:%M")));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("；"))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDonationRequest {
    pub donation_type: DonationCategory,
    pub amount: i64,
    pub donor_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub prayer: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub needs_receipt: bool,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Per-field validation, surfaced to the caller as a structured error list.
pub fn validate_request(req: &CreateDonationRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if req.amount <= 0 {
        errors.push(FieldError {
            field: "amount".to_string(),
            message: "amount must be greater than 0".to_string(),
        });
    }
    if req.donor_name.trim().is_empty() {
        errors.push(FieldError {
            field: "donor_name".to_string(),
            message: "donor name is required".to_string(),
        });
    }

    let email = req.email.as_deref().unwrap_or("").trim();
    if req.needs_receipt && email.is_empty() {
        errors.push(FieldError {
            field: "email".to_string(),
            message: "email is required when a receipt is requested".to_string(),
        });
    }
    if !email.is_empty() && !looks_like_email(email) {
        errors.push(FieldError {
            field: "email".to_string(),
            message: "email is not a valid address".to_string(),
        });
    }

    errors
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

pub fn err(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}
