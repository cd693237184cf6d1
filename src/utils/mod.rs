//! Utility functions for playersig

pub mod url;
