pub mod catalog;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod models;
pub mod red_flags;
pub mod service;
pub mod session;
pub mod sessions;
pub mod summary;
pub mod transport;

pub use crate::config::Config;
pub use crate::controller::{Effect, Event, handle_event};
pub use crate::error::{AssistantError, Result};
pub use crate::service::AssistantService;
pub use crate::session::{Gender, Profile, Role, SessionState, TranscriptEntry};
pub use crate::sessions::SessionStore;
