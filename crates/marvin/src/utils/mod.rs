//! Utilities module - text helpers used across handlers

pub mod text_utils;

pub use text_utils::TextUtils;
