use std::fmt;

use serde::{Deserialize, Serialize};

/// Apps whose exports can be imported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    MyFitnessPal,
    Cronometer,
    LoseIt,
    MacroFactor,
    Backup,
}

impl ImportSource {
    pub fn id(&self) -> &'static str {
        match self {
            Self::MyFitnessPal => "myfitnesspal",
            Self::Cronometer => "cronometer",
            Self::LoseIt => "loseit",
            Self::MacroFactor => "macrofactor",
            Self::Backup => "backup",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        source_catalog()
            .iter()
            .map(|c| c.source)
            .find(|s| s.id().eq_ignore_ascii_case(id.trim()))
    }

    pub fn config(&self) -> &'static ImportSourceConfig {
        source_config(*self)
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Static descriptor shown on the source picker.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSourceConfig {
    pub source: ImportSource,
    pub name: &'static str,
    pub supports_individual_foods: bool,
    pub is_premium: bool,
    pub instructions: &'static [&'static str],
}

static CATALOG: [ImportSourceConfig; 5] = [
    ImportSourceConfig {
        source: ImportSource::MyFitnessPal,
        name: "MyFitnessPal",
        supports_individual_foods: false,
        is_premium: false,
        instructions: &[
            "Open MyFitnessPal on the web and go to Settings > Export Data.",
            "Request the Nutrition Summary export for the date range you want.",
            "Download the CSV from the email link and select it here.",
        ],
    },
    ImportSourceConfig {
        source: ImportSource::Cronometer,
        name: "Cronometer",
        supports_individual_foods: true,
        is_premium: true,
        instructions: &[
            "Open Cronometer on the web and go to More > Account > Export Data.",
            "Choose \"Food & Recipe Entries\" and pick a date range.",
            "Save the CSV and select it here.",
        ],
    },
    ImportSourceConfig {
        source: ImportSource::LoseIt,
        name: "Lose It!",
        supports_individual_foods: true,
        is_premium: true,
        instructions: &[
            "Sign in at loseit.com and open Insights > Weekly Summary.",
            "Use \"Export to spreadsheet\" for each week you want to bring over.",
            "Select the downloaded CSV here. Exercise rows are ignored.",
        ],
    },
    ImportSourceConfig {
        source: ImportSource::MacroFactor,
        name: "MacroFactor",
        supports_individual_foods: true,
        is_premium: true,
        instructions: &[
            "In MacroFactor open More > Data Management > Data Export.",
            "Export either the Quick Export nutrition sheet or the food log as CSV.",
            "Select the exported file here.",
        ],
    },
    ImportSourceConfig {
        source: ImportSource::Backup,
        name: "MealMind Backup",
        supports_individual_foods: true,
        is_premium: false,
        instructions: &[
            "Select a CSV or JSON backup previously exported from MealMind.",
        ],
    },
];

pub fn source_catalog() -> &'static [ImportSourceConfig] {
    &CATALOG
}

pub fn source_config(source: ImportSource) -> &'static ImportSourceConfig {
    match source {
        ImportSource::MyFitnessPal => &CATALOG[0],
        ImportSource::Cronometer => &CATALOG[1],
        ImportSource::LoseIt => &CATALOG[2],
        ImportSource::MacroFactor => &CATALOG[3],
        ImportSource::Backup => &CATALOG[4],
    }
}
