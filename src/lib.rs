//! Glyphgate - contact intake and OCR tooling for an image-to-text site
//!
//! This crate implements the server side of a marketing site with a
//! built-in OCR utility: a contact endpoint guarded by a per-client
//! fixed-window rate limiter, and batch orchestration around a
//! third-party OCR engine.

pub mod config;
pub mod contact;
pub mod error;
pub mod http;
pub mod ocr;
pub mod ratelimit;
