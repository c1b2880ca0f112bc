//! # API Route Modules
//!
//! Each module provides a `router()` returning `Router<AppState>`; the
//! routers are merged in [`crate::app`].

pub mod subjects;
