//! The protocol engine of a Service Location Protocol agent.
//!
//! Three concerns live here, each pure and transport-free:
//!
//! * the wire codec for SLPv2 PDUs ([RFC 2608](https://datatracker.ietf.org/doc/html/rfc2608))
//!   with backward-compatible parsing of SLPv1 ([RFC 2165](https://datatracker.ietf.org/doc/html/rfc2165)),
//! * the typed attribute store and its bidirectional string encoding,
//! * the LDAPv3 search-filter evaluator ([RFC 2254](https://datatracker.ietf.org/doc/html/rfc2254))
//!   that matches predicates against attribute sets.
//!
//! Decoding borrows from the receive buffer where the protocol allows it;
//! encoding writes into caller-owned output. Nothing here retries, blocks,
//! or performs I/O — the enclosing transport owns timeouts and delivery.
//!
//! ```rust
//! use slp_codec::predicate_matches;
//!
//! assert!(predicate_matches(
//!     "(x=5),(y=hello world)",
//!     "(&(x>=3)(y=hel*))",
//! ));
//! ```

#![deny(missing_debug_implementations)]

pub mod attr;
pub mod codec;
pub mod compare;
/// Raw parsers for the SLPv1 wire format (RFC 2165).
pub mod rfc2165;
/// The search-filter grammar and evaluator (RFC 2254).
pub mod rfc2254;
/// Raw nom parsers for the SLPv2 wire format (RFC 2608).
pub mod rfc2608;
pub mod sync;
pub mod utils;

pub use slp_types;
pub use slp_types as types;

pub use crate::{
    attr::{AttrType, AttrValue, Attributes, Policy},
    codec::{Decode, Encode},
    rfc2254::{filter_attributes, predicate_matches, Filter, FilterOp},
};
