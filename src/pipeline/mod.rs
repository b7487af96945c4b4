//! Pipeline stages for merging mixed documents into one PDF.
//!
//! Each submodule implements one transformation step and is testable on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ render ──▶ assemble
//! (order)   (per format) (A4 pages)  (one PDF)
//! ```
//!
//! 1. [`input`]   : turn the requested order into a list of items; bad
//!    entries become warnings
//! 2. [`extract`] : dispatch on extension: text, [`docx`] paragraphs,
//!    [`sheet`] grids, PDF pass-through, decoded images
//! 3. [`render`]  : lay text out with [`layout`] and fit images with
//!    [`encode`], producing standalone page fragments
//! 4. [`assemble`]: concatenate fragments into a single page tree and
//!    serialise

pub mod assemble;
pub mod docx;
pub mod encode;
pub mod extract;
pub mod input;
pub mod layout;
pub mod render;
pub mod sheet;
