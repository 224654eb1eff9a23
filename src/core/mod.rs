/// Stock deduction for closed requisitions
pub mod deduction;
/// Monthly token renewal run and its window
pub mod monthly;
/// Per-class renewal eligibility and renewal records
pub mod renewal;
/// Requisition submission, review and receipt acknowledgement
pub mod requisition;
/// Stock items and inventory movements
pub mod stock;
/// Users and token balances
pub mod user;
