//! Challenge assignment resolution
//!
//! For a certificate covering many hostnames, deterministically selects
//! which challenge configuration (validation method + credential)
//! applies to each hostname when multiple, possibly overlapping,
//! per-domain rules exist.

pub mod matcher;
pub mod resolver;

pub use matcher::is_domain_or_wildcard_match;
pub use resolver::{get_domains_matching, resolve};
