// src/services/mod.rs

pub mod ingestion_service;
pub mod prize_service;
pub mod redemption_service;

pub use ingestion_service::{IngestTarget, IngestionService, IngestionSummary};
pub use prize_service::PrizeService;
pub use redemption_service::{RedemptionOutcome, RedemptionService};
