//! Core library for the school admission intake and review service.
//!
//! The registration lifecycle engine lives under [`workflows::registration`]:
//! the status state machine, the document checklist gating submission, the
//! registration-number allocator, and the notification dispatch seams. Admin
//! accounts, sessions, and the review surface live under
//! [`workflows::admin`]. Storage is abstracted behind repository traits so
//! the service layer can be exercised against in-memory adapters.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
