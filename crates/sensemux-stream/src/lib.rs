pub mod analyzer;
pub mod host;
pub mod report;
pub mod scheduler;

pub use analyzer::{Analyzer, BehaviorAnalyzer, SignAnalyzer};
pub use host::StreamHost;
pub use report::synthesize_session_report;
pub use scheduler::{InFlightGuard, InFlightPermit, StreamHandle, StreamPhase, StreamScheduler};
