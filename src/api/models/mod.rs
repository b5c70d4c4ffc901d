pub mod energy;
pub mod system;

pub use energy::{
    CostAnalysisResponse, ExportQuery, HistoryQuery, RealtimeResponse, RealtimeSummary,
};
pub use system::{SystemStatusResponse, UpdateCircuitRequest};
