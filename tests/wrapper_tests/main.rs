//! Tests for wrapper datastores
//!
//! - keytransform: key rewriting, inverse law, query key space
//! - tiered: write fan-out, read fallback, last-tier queries
