//! Application layer services implementing business logic.
//!
//! Services coordinate repository calls inside transactions and expose a
//! backend-agnostic API to HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::shortener_service::ShortenerService`] - Short id assignment and resolution

pub mod services;
