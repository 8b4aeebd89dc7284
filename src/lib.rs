//! Concierge — tool-orchestration run engine.
//!
//! Mediates between an end user and a remote assistant service, augmenting
//! it with retrieval and external action tools: the engine starts a run for
//! the active thread, polls it, dispatches the tool calls the model asks
//! for, submits the outputs back, and assembles the final answer together
//! with its source citations.
//!
//! # Quick Start
//!
//! ```no_run
//! use concierge::prelude::*;
//!
//! # async fn example() -> concierge::error::Result<()> {
//! let config = ConciergeConfig::from_env()?;
//! let chat = Chat::new(&config);
//! let response = chat
//!     .handle_turn(&TurnRequest {
//!         role: "user".to_string(),
//!         content: "What is the refund policy?".to_string(),
//!         thread_id: None,
//!     })
//!     .await?;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod chat;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod session;
pub mod tools;
