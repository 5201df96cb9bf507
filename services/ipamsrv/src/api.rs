//! ipamsrv REST API
//!
//! Handlers are grouped by resource; routes are wired in [`crate::routes`].

pub mod dto;
pub mod health_handlers;
pub mod ipam_handlers;
pub mod probe_handlers;
