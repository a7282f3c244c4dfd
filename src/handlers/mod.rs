//! HTTP handlers, grouped by concern.
//!
//! Every handler resolves a `Principal` (or runs behind a middleware that does), builds
//! its `AccessScope`, and delegates to the repository. Errors are `ApiError`s.

pub mod auth;
pub mod crud;
pub mod dashboard;
pub mod data;
pub mod forms;
pub mod uploads;
