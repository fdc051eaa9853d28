//! Data Transfer Objects for API responses.
//!
//! Shortening takes a raw text body and answers with a bare JSON string, so
//! only the health report needs a dedicated shape.

pub mod health;
