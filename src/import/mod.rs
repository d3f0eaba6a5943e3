pub mod csv_input;
pub mod detector;
mod dto;
pub mod engine;
pub mod parsers;
pub mod session;
pub mod sources;
pub mod utils;

pub use detector::{detect_parser, get_parser, DetectedParser, DETECTION_ORDER};
pub use dto::{ConflictResolution, ImportConflict, ImportError, ImportResult, ImportStatus, ImportType};
pub use engine::CommitOptions;
pub use parsers::{NutritionParser, SourceParser};
pub use session::{ImportSessionManager, NutritionImportSession};
pub use sources::{source_catalog, source_config, ImportSource, ImportSourceConfig};
pub use utils::RowRecord;
