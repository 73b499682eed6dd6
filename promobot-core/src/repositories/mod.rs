// src/repositories/mod.rs

pub use promobot_common::traits::repository_traits::{
    CodeRepository,
    WinnerCodeRepository,
    PrizeRepository,
    UsageLogRepository,
    UserRepository,
    SettingsRepository,
};

pub use postgres::codes::PostgresCodeRepository;
pub use postgres::winner_codes::PostgresWinnerCodeRepository;
pub use postgres::prizes::PostgresPrizeRepository;
pub use postgres::usage_log::PostgresUsageLogRepository;
pub use postgres::users::PostgresUserRepository;
pub use postgres::settings::PostgresSettingsRepository;

pub mod postgres;
