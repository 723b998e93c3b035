//! ragchat - A terminal client for a document question-answering backend
//!
//! This crate provides:
//! - Upload of a PDF to the backend, with a simulated multi-stage progress indicator
//! - Questions about the uploaded document, answered with page citations
//! - A conversation log rendered as paragraphs with bold emphasis

pub mod api;
pub mod chat;
pub mod cite;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
