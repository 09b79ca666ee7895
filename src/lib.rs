//! EnrollPay - Purchase lifecycle and payment reconciliation backend.
//!
//! This crate turns a user's intent to buy a paid offering (a program
//! enrollment or a paid event ticket) into a durable purchase record, kept
//! consistent with the payment processor's asynchronous webhook delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
