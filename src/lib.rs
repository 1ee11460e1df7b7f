pub mod aggregate;
pub mod connectors;
pub mod console;
pub mod export;
pub mod render;
pub mod session;
pub mod target;

pub mod prelude {
    pub use crate::aggregate::{AggregatedReport, ReportKind, run_report};
    pub use crate::connectors::{Connector, ConnectorResult, Failure, FailureKind};
    pub use crate::session::{Session, SessionConfig};
    pub use crate::target::Target;
}
