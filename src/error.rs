use std::fmt;

/// Why `SelectionSet::add` refused a pick. Selection state is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    IncompleteChoice,
    CapacityExceeded,
    DuplicateCombination,
}

impl RejectionReason {
    /// Catalog key for the transient notice shown to the user.
    pub fn message_key(self) -> &'static str {
        match self {
            RejectionReason::IncompleteChoice => "notices.incompleteChoice",
            RejectionReason::CapacityExceeded => "notices.capacityExceeded",
            RejectionReason::DuplicateCombination => "notices.duplicateCombination",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RejectionReason::IncompleteChoice => write!(f, "please select both a year and an institution"),
            RejectionReason::CapacityExceeded => write!(f, "maximum of 5 selections allowed"),
            RejectionReason::DuplicateCombination => write!(f, "this combination is already selected"),
        }
    }
}

impl std::error::Error for RejectionReason {}

/// The table text could not be read as a delimited table at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyInput,
    MissingInstitutionColumn,
    Malformed(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "no table content could be read"),
            ParseError::MissingInstitutionColumn => write!(f, "header has no Institution column"),
            ParseError::Malformed(details) => write!(f, "malformed table: {details}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Non-fatal problem with a single row; the parser keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowParseWarning {
    pub line: u64,
    pub message: String,
}

impl fmt::Display for RowParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The source table is unavailable: fatal for the session.
#[derive(Debug)]
pub enum SourceError {
    Io { location: String, source: std::io::Error },
    Http { location: String, details: String },
    HtmlInsteadOfTable { location: String },
    Empty { location: String },
    Parse(ParseError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceError::Io { location, source } => write!(f, "failed to read {location}: {source}"),
            SourceError::Http { location, details } => write!(f, "failed to fetch {location}: {details}"),
            SourceError::HtmlInsteadOfTable { location } => {
                write!(f, "{location} returned an HTML page instead of a table")
            }
            SourceError::Empty { location } => write!(f, "{location} is empty"),
            SourceError::Parse(err) => write!(f, "failed to parse table: {err}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            SourceError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for SourceError {
    fn from(err: ParseError) -> Self {
        SourceError::Parse(err)
    }
}
