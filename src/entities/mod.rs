//! Database entities.
//!
//! Stock-bearing rows (`procurement`, `deployment`) point at a `part`; every
//! bookkeeping row points at the `user` who recorded it.

pub mod deployment;
pub mod expense;
pub mod part;
pub mod procurement;
pub mod property;
pub mod sale;
pub mod user;
