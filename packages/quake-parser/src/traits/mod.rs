//! Core trait abstractions.
//!
//! These traits define the seams where applications plug in storage, model
//! inference, fetching and search. Every collaborator is injected; nothing is
//! a process-wide singleton.

pub mod blob;
pub mod fetcher;
pub mod inferrer;
pub mod searcher;
pub mod store;
