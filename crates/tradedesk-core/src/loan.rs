//! # Loan Amortizer
//!
//! Turns principal, flat rate and term into an installment schedule.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  interest     = round_half_up(principal × bps / 10000)                 │
//! │  total        = principal + interest                                    │
//! │  installment  = total / term            (integer division)             │
//! │  last         = total − installment × (term − 1)                       │
//! │                                                                         │
//! │  due(n)       = start_date + n months   (clamped to month end)         │
//! │                                                                         │
//! │  Example: 1000.00 at 10% over 3 months                                 │
//! │    interest 100.00, total 1100.00                                       │
//! │    366.66, 366.66, 366.68                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schedule always sums back to the loan total.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Installment, InstallmentStatus, InterestRate};
use crate::validation::{validate_interest_rate, validate_loan_term, validate_positive};

/// One row of a generated schedule, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScheduledInstallment {
    /// 1-based.
    pub sequence: u32,
    pub amount: Money,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanSchedule {
    pub principal: Money,
    pub rate: InterestRate,
    pub interest: Money,
    pub total: Money,
    pub installments: Vec<ScheduledInstallment>,
}

impl LoanSchedule {
    pub fn term_months(&self) -> u32 {
        self.installments.len() as u32
    }

    pub fn installment_sum(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

/// Builds the schedule for a flat-interest loan.
///
/// ## Errors
/// - `principal` not positive
/// - `term_months` outside `1..=MAX_LOAN_TERM_MONTHS`
/// - a due date past the calendar range
///
/// ```rust
/// use chrono::NaiveDate;
/// use tradedesk_core::loan::amortize;
/// use tradedesk_core::money::Money;
/// use tradedesk_core::types::InterestRate;
///
/// let start = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
/// let schedule = amortize(Money::from_cents(100_000), InterestRate::from_bps(1000), 3, start).unwrap();
/// assert_eq!(schedule.total.cents(), 110_000);
/// assert_eq!(schedule.installments[0].due_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
/// ```
pub fn amortize(
    principal: Money,
    rate: InterestRate,
    term_months: u32,
    start_date: NaiveDate,
) -> CoreResult<LoanSchedule> {
    validate_positive("principal_cents", principal.cents())?;
    validate_interest_rate(rate.bps())?;
    validate_loan_term(term_months)?;

    let interest = principal.apply_rate(rate);
    let total = principal + interest;

    let installments = total
        .split_even(term_months)
        .into_iter()
        .zip(1..=term_months)
        .map(|(amount, sequence)| {
            Ok(ScheduledInstallment {
                sequence,
                amount,
                due_date: due_date(start_date, sequence)?,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(LoanSchedule {
        principal,
        rate,
        interest,
        total,
        installments,
    })
}

/// `start` plus `months`, with the day clamped to the end of the target month.
pub fn due_date(start: NaiveDate, months: u32) -> CoreResult<NaiveDate> {
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "start_date".to_string(),
                min: 0,
                max: i64::from(months),
            }
            .into()
        })
}

// =============================================================================
// Stored Installments
// =============================================================================

/// Sum of the installments still pending.
pub fn outstanding(installments: &[Installment]) -> Money {
    installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Pending)
        .map(|i| Money::from_cents(i.amount_cents))
        .sum()
}

/// Whether every installment is paid (an empty schedule is not settled).
pub fn is_settled(installments: &[Installment]) -> bool {
    !installments.is_empty()
        && installments
            .iter()
            .all(|i| i.status == InstallmentStatus::Paid)
}

/// The earliest pending installment, by sequence.
pub fn next_due(installments: &[Installment]) -> Option<&Installment> {
    installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Pending)
        .min_by_key(|i| i.sequence)
}
