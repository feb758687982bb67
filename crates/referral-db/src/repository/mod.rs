//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`customer`] - the referrer store (`customers` table)
//! - [`transaction`] - the referral transaction store
//!
//! Repositories translate between the pure types of `referral-core` and
//! SQL, and return [`crate::DbError`] for every failure. State transitions
//! that must not race (marking a transaction sent, resetting it) are single
//! conditional UPDATE statements, never read-then-write.

pub mod customer;
pub mod transaction;
