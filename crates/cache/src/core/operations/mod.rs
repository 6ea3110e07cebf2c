//! Cache operations, split by kind

mod get;
mod misc;
mod put;
mod remove;
