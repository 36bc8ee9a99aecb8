//! Pipeline stages for beam-schedule extraction.
//!
//! Each submodule implements one transformation step. The normalization
//! stages ([`rules`], [`reinforcement`], [`stirrups`], [`merge`],
//! [`response`]) are pure and never touch the filesystem, the network or
//! the environment.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ classify ──▶ gather ─────────────────────▶ merge
//! (*.pdf)   (pdfium)   (page 1)     │ slice ▶ llm ▶ response      (dedup, order,
//!                                   │ (bands) (VLM) (safe JSON)    null rows)
//! ```
//!
//! 1. [`input`]: find `*.pdf` files and check their magic bytes
//! 2. [`render`]: rasterise pages to `page_<n>.png`; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`classify`]: ask the model which of the eight layouts page 1 shows
//! 4. [`gather`]: per page (or per [`slice`]), call the model through
//!    [`llm`] and parse the reply with [`response`]
//! 5. [`merge`]: combine fragments and normalise every field with the
//!    layout's rule tables

pub mod classify;
pub mod encode;
pub mod gather;
pub mod input;
pub mod llm;
pub mod merge;
pub mod reinforcement;
pub mod render;
pub mod response;
pub mod rules;
pub mod slice;
pub mod stirrups;
