//! Application error carried through every fallible step.
//!
//! Exit codes:
//! - `1` invalid user input (unknown state, unparseable date)
//! - `2` filesystem / artifact problems
//! - `3` no usable data after transformation
//! - `4` network or terminal runtime failures

#[derive(Clone)]
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

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
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
