use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use stallhub_entity::booking::BillingDetails;
use stallhub_entity::requester::Requester;

use super::error::AllocationError;

/// A request to allocate a set of stalls to one requester, all or nothing.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AllocationRequest {
    /// Exhibition the stalls belong to.
    pub exhibition_id: Uuid,
    /// Stalls wanted, in the order they should be locked and billed.
    #[validate(length(min = 1, message = "At least one stall is required"))]
    pub stall_ids: Vec<Uuid>,
    /// Who is asking.
    pub requester: Requester,
    /// Discount to apply, looked up in the requester role's list.
    pub discount_id: Option<String>,
    /// Invoice addressee.
    #[validate(nested)]
    pub billing: BillingDetails,
}

impl AllocationRequest {
    /// Runs field validation and rejects repeated stall ids.
    pub fn check(&self) -> Result<(), AllocationError> {
        self.validate()
            .map_err(|e| AllocationError::Validation(e.to_string()))?;

        let mut seen = HashSet::with_capacity(self.stall_ids.len());
        if let Some(dup) = self.stall_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AllocationError::Validation(format!(
                "Stall {dup} is requested more than once"
            )));
        }
        Ok(())
    }

    /// The discount id, treating a blank value as none.
    pub fn discount_id(&self) -> Option<&str> {
        self.discount_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
