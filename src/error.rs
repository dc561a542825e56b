/// Exit code for rejected configuration values.
pub const EXIT_INVALID_INPUT: u8 = 2;
/// Exit code for estimation runs without usable shot data.
pub const EXIT_INSUFFICIENT_DATA: u8 = 3;
/// Exit code for qubit-range bookkeeping failures.
pub const EXIT_LAYOUT: u8 = 4;
/// Exit code for config/export file failures.
pub const EXIT_IO: u8 = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Input-validation failure naming the offending field and the violated constraint.
    pub fn invalid(field: &str, constraint: impl std::fmt::Display) -> Self {
        Self::new(
            EXIT_INVALID_INPUT,
            format!("Invalid `{field}`: {constraint}."),
        )
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_INSUFFICIENT_DATA, message)
    }

    /// Register allocation / overlap problems detected while composing circuits.
    pub fn layout(message: impl Into<String>) -> Self {
        Self::new(EXIT_LAYOUT, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_validation(&self) -> bool {
        self.exit_code == EXIT_INVALID_INPUT
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
