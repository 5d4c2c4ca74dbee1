//! `marketpay-parties` — membership and employment records.
//!
//! The marketplace's party profiles (companies, drivers, riders) are managed
//! elsewhere; this crate holds only the two party-side facts the settlement
//! core consumes: a company's membership state and the company↔driver
//! employment relation that payroll is gated on.

pub mod employment;
pub mod membership;

pub use employment::EmploymentRelation;
pub use membership::{MembershipState, MEMBERSHIP_EXTENSION_DAYS};
