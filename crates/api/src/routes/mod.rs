//! Route handlers

pub mod pages;
pub mod status;
pub mod stream;
