//! Error types for packvar-value

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A value could not be converted; `path` locates the failing element.
    #[error("{}", describe(.path, .message))]
    Conversion { path: Vec<PathStep>, message: String },

    #[error("Invalid number literal {text:?}")]
    InvalidNumber { text: String },
}

impl Error {
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Prefixes the error path with `step`.
    pub fn at(self, step: PathStep) -> Self {
        match self {
            Self::Conversion { mut path, message } => {
                path.insert(0, step);
                Self::Conversion { path, message }
            }
            other => other,
        }
    }
}

/// One step of the path to a nested element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Attribute(String),
    Key(String),
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(name) => write!(f, "attribute {name:?}"),
            Self::Key(key) => write!(f, "element {key:?}"),
            Self::Index(index) => write!(f, "element {index}"),
        }
    }
}

fn describe(path: &[PathStep], message: &str) -> String {
    if path.is_empty() {
        return message.to_string();
    }
    let steps: Vec<String> = path.iter().map(ToString::to_string).collect();
    format!("{}: {message}", steps.join(", "))
}
