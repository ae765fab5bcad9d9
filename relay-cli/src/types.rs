//! Common types used across CLI modules

use uuid::Uuid;

/// How a user refers to a run on the command line
///
/// Accepts a full UUID, `#<number>` for the run number, or an unambiguous
/// UUID prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRef {
    Full(Uuid),
    Number(u64),
    Prefix(String),
}

impl RunRef {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Ok(uuid) = Uuid::parse_str(input) {
            return RunRef::Full(uuid);
        }
        if let Some(number) = input.strip_prefix('#').and_then(|n| n.parse().ok()) {
            return RunRef::Number(number);
        }
        RunRef::Prefix(input.to_lowercase())
    }
}

impl std::fmt::Display for RunRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunRef::Full(uuid) => write!(f, "{}", uuid),
            RunRef::Number(number) => write!(f, "#{}", number),
            RunRef::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

impl From<&str> for RunRef {
    fn from(s: &str) -> Self {
        RunRef::parse(s)
    }
}
