use tracing::debug;

use super::parsers::{NutritionParser, SourceParser};
use super::sources::ImportSource;

/// Probe order for auto-detection. A minimal `Date, Meal, Calories` file satisfies
/// more than one predicate, so the first match wins and this order is part of the
/// contract.
pub const DETECTION_ORDER: [ImportSource; 5] = [
    ImportSource::MyFitnessPal,
    ImportSource::Cronometer,
    ImportSource::LoseIt,
    ImportSource::MacroFactor,
    ImportSource::Backup,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedParser {
    pub source: ImportSource,
    pub parser: SourceParser,
}

/// First registered parser that recognises `headers`, if any.
pub fn detect_parser(headers: &[String]) -> Option<DetectedParser> {
    if headers.is_empty() {
        return None;
    }

    let detected = DETECTION_ORDER
        .iter()
        .map(|&source| DetectedParser {
            source,
            parser: SourceParser::for_source(source),
        })
        .find(|d| d.parser.detect(headers));

    debug!(?headers, source = ?detected.map(|d| d.source), "format detection");
    detected
}

/// Direct lookup for when the user picked the source themselves.
pub fn get_parser(source: ImportSource) -> SourceParser {
    SourceParser::for_source(source)
}
