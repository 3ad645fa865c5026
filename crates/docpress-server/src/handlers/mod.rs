//! Request handlers, grouped by surface

pub mod admin;
pub mod compare;
pub mod databases;
pub mod jobs;
pub mod meta;
pub mod pages;
