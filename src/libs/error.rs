use std::fmt;

/// Fatal problems in the input files. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A record that could not be parsed
    Malformed {
        /// Which kind of file was being read
        source: String,
        /// The line number (1-based)
        line: usize,
        message: String,
    },
    /// A sequence referenced by a record is absent from a lookup table
    MissingSequence { table: String, name: String },
    /// A read midpoint that lies outside its sequence
    Orientation {
        read: String,
        contig: String,
        position: u64,
        length: u64,
    },
}

impl InputError {
    pub fn malformed(source: &str, line: usize, message: impl Into<String>) -> Self {
        InputError::Malformed {
            source: source.to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn missing(table: &str, name: &str) -> Self {
        InputError::MissingSequence {
            table: table.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Malformed {
                source,
                line,
                message,
            } => write!(f, "Malformed {} record at line {}: {}", source, line, message),
            InputError::MissingSequence { table, name } => {
                write!(f, "Sequence {} is missing from the {} table", name, table)
            }
            InputError::Orientation {
                read,
                contig,
                position,
                length,
            } => write!(
                f,
                "Unexpected length in contig links attribution: read {} at {} on {} of length {}",
                read, position, contig, length
            ),
        }
    }
}

impl std::error::Error for InputError {}
