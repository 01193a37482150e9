use serde::{Deserialize, Serialize};
use tracing::debug;

/// Literal marker whose presence means the critic approved the recipe
pub const PASSED_MARKER: &str = "Overall Status: PASSED";

/// Literal marker for a rejected recipe
pub const FAILED_MARKER: &str = "Overall Status: FAILED";

/// The constraint that is judged by the taste rating rather than the recipe text
pub const TASTE_CONSTRAINT: &str = "taste must be rated 7/10 or higher";

/// Minimum taste rating for [`TASTE_CONSTRAINT`]
pub const TASTE_THRESHOLD: u8 = 7;

const STATUS_PREFIX: &str = "Overall Status:";
const TASTE_PREFIX: &str = "taste rating:";

/// How the overall verdict is read from critique text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictMode {
    /// Passed iff the critique contains [`PASSED_MARKER`] anywhere
    #[default]
    Marker,
    /// Passed iff the last `Overall Status:` line reads exactly `PASSED`
    Strict,
}

impl std::str::FromStr for VerdictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "marker" => Ok(VerdictMode::Marker),
            "strict" => Ok(VerdictMode::Strict),
            _ => Err(format!("Unknown verdict mode: {}", s)),
        }
    }
}

/// The overall verdict of one critique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    /// Read the verdict from critique text
    pub fn detect(critique: &str, mode: VerdictMode) -> Self {
        let passed = match mode {
            VerdictMode::Marker => critique.contains(PASSED_MARKER),
            VerdictMode::Strict => Self::last_status_line(critique)
                .map(|status| status == "PASSED")
                .unwrap_or(false),
        };

        debug!(?mode, passed, "Detected critic verdict");

        if passed {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }

    fn last_status_line(critique: &str) -> Option<&str> {
        critique
            .lines()
            .map(|line| line.trim().trim_matches(|c| c == '*' || c == '\'' || c == '"'))
            .filter_map(|line| line.strip_prefix(STATUS_PREFIX))
            .map(|status| {
                status
                    .trim()
                    .trim_matches(|c| c == '*' || c == '\'' || c == '"' || c == '.')
                    .trim()
            })
            .last()
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    /// Get a short description of the verdict for logging
    pub fn short_description(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_description())
    }
}

/// Whether the critique carries both the PASSED and FAILED markers
pub fn has_conflicting_markers(critique: &str) -> bool {
    critique.contains(PASSED_MARKER) && critique.contains(FAILED_MARKER)
}

/// Find the `Taste Rating: N/10` value, if the critic wrote one.
///
/// Informational only; never used to decide the verdict.
pub fn extract_taste_rating(critique: &str) -> Option<u8> {
    critique.lines().find_map(|line| {
        let lower = line.to_lowercase();
        let start = lower.find(TASTE_PREFIX)? + TASTE_PREFIX.len();
        let digits: String = lower[start..]
            .trim_start()
            .trim_start_matches('[')
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u8>().ok().filter(|rating| *rating <= 10)
    })
}
