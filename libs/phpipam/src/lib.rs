//! phpIPAM API access
//!
//! - [`client`]: URL building, token header, per-call timeout
//! - [`envelope`]: turns phpIPAM's response envelopes into values or errors
//! - [`normalize`]: alias-driven field lookup and address formatting
//!
//! ```text
//! PhpIpamClient::fetch ──▶ envelope::decode ──▶ serde_json::Value
//!                                                   │
//!                                                   ▼
//!                               normalise_list / resolve_id / format_subnet
//! ```

pub mod client;
pub mod envelope;
mod error;
pub mod normalize;

pub use client::{build_url, ApiTarget, FetchOptions, PhpIpamApi, PhpIpamClient, DEFAULT_TIMEOUT};
pub use error::{PhpIpamError, Result};
pub use normalize::{
    first_present, format_subnet, int_to_ipv4, normalise_list, resolve_id, text_field,
    value_to_text, ID_ALIASES,
};
