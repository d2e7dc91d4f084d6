//! Billing details captured with a booking.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Who the invoice is addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BillingDetails {
    /// Company name printed on the invoice.
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    /// Contact person.
    #[validate(length(min = 1, max = 200))]
    pub contact_name: String,
    /// Billing email.
    #[validate(email)]
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Tax registration number (GSTIN, VAT id...).
    pub tax_id: Option<String>,
}
