pub mod session;
pub mod settings;

pub use session::{AnalysisResult, AnalysisSession, FileSummary};
pub use settings::{Settings, SettingsUpdate};
