pub mod dashboard;
pub mod rates;
pub mod readings;
pub mod rollups;

pub use dashboard::DashboardRepository;
pub use rates::RateRepository;
pub use readings::ReadingRepository;
pub use rollups::RollupRepository;
