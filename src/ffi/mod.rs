//! # FFI Bindings
//!
//! Host bindings over the [`crate::api`] string boundary.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FFI ARCHITECTURE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  TypeScript / Node (CLI, archive packager, host loader)                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Platform Bindings                            │   │
//! │  │                                                                 │   │
//! │  │  Web / Node:  wasm-bindgen → TypeScript                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      api (string boundary)                      │   │
//! │  │                                                                 │   │
//! │  │  Keys │ Hybrid KEM │ ML-KEM │ Documents │ Binary               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Errors cross the boundary as their [`crate::error::ErrorReport`] text,
//! `"[code] message"`, which JavaScript receives as a thrown string.

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;
