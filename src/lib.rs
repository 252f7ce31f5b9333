//! Support Chat - Conversational support widget core
//!
//! A chat session that streams replies from a hosted completion backend and
//! switches to a scripted dialogue to collect a visitor's name and email
//! when they ask to subscribe or register.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
