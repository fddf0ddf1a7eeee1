//! Data structures for the Service Location Protocol (RFC 2608, RFC 2165).
//!
//! This crate holds the passive data model: typed messages, validated string
//! newtypes, and the error taxonomy. The wire codec, the attribute store, and
//! the predicate evaluator live in the companion `slp-codec` crate.

#![deny(missing_debug_implementations)]

pub mod core;
pub mod error;
pub mod message;
pub mod utils;

pub use crate::{
    core::{AttrTag, AttrTagError, LanguageTag, LanguageTagError},
    error::{ErrorCode, SlpError},
    message::{
        AttrRply, AttrRqst, AuthBlock, Body, Charset, DaAdvert, Extension, Flags, FunctionId,
        Header, Message, NamingAuthority, SaAdvert, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst,
        SrvTypeRply, SrvTypeRqst, UrlEntry, Version,
    },
};
