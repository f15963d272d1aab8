use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PostResult<T> = Result<T, PostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostErrorCategory {
    FormatError,
    MissingDataError,
    IoError,
    InternalError,
}

impl PostErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::FormatError => 2,
            Self::MissingDataError => 3,
            Self::IoError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FormatError => "FormatError",
            Self::MissingDataError => "MissingDataError",
            Self::IoError => "IoError",
            Self::InternalError => "InternalError",
        }
    }
}

impl Display for PostErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Error shared by every reader, writer and decoder in the crate.
///
/// `placeholder` is a stable dotted code (`FORMAT.PSEUDO_TAGS`,
/// `MISSING.CHARGE_NGM_G`, ...) that callers can branch on without
/// matching message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostError {
    category: PostErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl PostError {
    pub fn new(
        category: PostErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PostErrorCategory::FormatError, placeholder, message)
    }

    pub fn missing_data(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PostErrorCategory::MissingDataError, placeholder, message)
    }

    pub fn io(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PostErrorCategory::IoError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PostErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> PostErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn is_format(&self) -> bool {
        self.category == PostErrorCategory::FormatError
    }

    pub fn is_missing_data(&self) -> bool {
        self.category == PostErrorCategory::MissingDataError
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for PostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category, self.placeholder, self.message)
    }
}

impl Error for PostError {}
