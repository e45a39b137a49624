//! Answer Bot - fuzzy question-answer lookup that learns from its users.

pub mod chat;
pub mod config;
pub mod knowledge;
pub mod web;
