//! Immunization proof workflow for the Health Gateway portal.
//!
//! Resolves a patient's vaccination status from the PHSA registry, requests a
//! proof of vaccination from BC Mail Plus and polls the generated job until
//! the document is ready.

pub mod config;
pub mod error;
pub mod immunization;
pub mod telemetry;
