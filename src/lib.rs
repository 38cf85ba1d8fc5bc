//! Venture Mentor
//!
//! An entrepreneurship mentoring assistant that:
//! - Grounds answers in a knowledge base of lectures and frameworks
//! - Lets the language model call a deterministic financial calculator
//! - Returns the answer with citable sources and a record of tool calls
//!
//! REQUEST LOOP:
//! QUERY → RETRIEVE → COMPOSE → COMPLETE ⇄ CALCULATE → ANSWER

pub mod agent;
pub mod api;
pub mod calculator;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod retrieval;
pub mod tools;

pub use error::{MentorError, Result};

// Re-export common types
pub use agent::{ChatRequest, Orchestrator};
pub use config::MentorConfig;
pub use models::*;
