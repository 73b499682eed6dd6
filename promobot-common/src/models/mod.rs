// File: promobot-common/src/models/mod.rs
pub mod code;
pub mod prize;
pub mod usage;
pub mod user;

pub use code::{Code, WinnerCode};
pub use prize::{Prize, PrizeTier};
pub use usage::UsageLogEntry;
pub use user::User;
