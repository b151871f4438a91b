#![no_std]
#![forbid(
    missing_docs,
    unsafe_code,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
//! Internal data model for [`faultline`].
//!
//! # Overview
//!
//! This crate holds the two abstractions every part of [`faultline`] is
//! written against:
//!
//! - [`TypeInfo`]: an explicit runtime type identity. Failure types declare
//!   their parent type, generic shapes declare their arity, and
//!   instantiations carry their type arguments. This table replaces runtime
//!   reflection: rule resolution walks the declared ancestry instead of
//!   inspecting language metadata.
//! - [`Failure`]: the abstract handle the formatter holds for each error
//!   occurrence. It exposes the runtime type identity, the message, an
//!   optional stack trace, a map of extra data and the nested causes.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`faultline`] crate,
//! which re-exports everything public from here.
//!
//! [`faultline`]: https://docs.rs/faultline/latest/faultline/

extern crate alloc;

mod failure;
mod type_info;

pub use failure::{ExtraData, Failure, FailureId, same_failure};
pub use type_info::{Ancestors, TypeInfo};
