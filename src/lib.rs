//! Kai Mentor - Trading-coach conversation policy engine
//!
//! This crate decides the phase of a coaching dialogue (explore, summarize,
//! structure), detects behavioral signals in free text, scores how much
//! concrete context has been gathered and produces sanitized replies
//! together with a state patch for the caller to persist.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
