//! Company↔driver employment relation.
//!
//! Created by the (out-of-scope) invitation/application workflows when a
//! company accepts a driver; the settlement core only ever reads it to gate
//! salary payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketpay_core::{CompanyId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentRelation {
    pub company_id: CompanyId,
    pub driver_user_id: UserId,
    /// Agreed base salary in cents; informational for payroll callers.
    pub base_salary_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl EmploymentRelation {
    pub fn new(
        company_id: CompanyId,
        driver_user_id: UserId,
        base_salary_cents: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            driver_user_id,
            base_salary_cents,
            created_at,
        }
    }
}
