//! Entitlements - Membership purchase, expiry and access service
//!
//! Records premium purchases, grants a calendar-month premium period on
//! successful payment, periodically downgrades lapsed premium profiles, and
//! answers "may this user see premium content right now?".

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
