#![doc = "download-portal-core: core logic library for download-portal."]

//! This crate contains the storage contract, the version-aware retention
//! engine and the prune pipeline. It has no HTTP or storage-backend
//! dependencies; those live in the `download-portal` crate.
//!
//! # Usage
//! - [`retention::group`] + [`retention::decide`] for the pure decision.
//! - [`prune::prune`] to run list → decide → delete against a backend.

pub mod classify;
pub mod contract;
pub mod normalize;
pub mod prune;
pub mod retention;
pub mod version;
