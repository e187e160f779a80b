use std::collections::HashMap;

use crate::Error;
use crate::Result;

pub(crate) const DEFAULT_SENDER_NAME: &str = "outbound-sender";

pub const ENV_SENDER_NAME: &str = "OUTBOUND_SENDER_NAME";
pub const ENV_SENDER_STACK_SIZE: &str = "OUTBOUND_SENDER_STACK_SIZE";

/// Settings for a single sender instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Diagnostic name, also used as the worker thread name.
    pub name: String,
    /// Stack size of the worker thread, platform default when `None`.
    pub stack_size: Option<usize>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            name: DEFAULT_SENDER_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl SenderConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// The name ends up as a thread name, which must not be empty or contain NUL bytes.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("sender name is empty".to_string()));
        }
        if self.name.contains('\0') {
            return Err(Error::Config(format!(
                "sender name {:?} contains a NUL byte",
                self.name
            )));
        }
        if self.stack_size == Some(0) {
            return Err(Error::Config("stack size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Loads the config from environment-style variables, e.g. `env::vars().collect()`.
/// Missing variables fall back to the defaults.
impl TryFrom<HashMap<String, String>> for SenderConfig {
    type Error = Error;

    fn try_from(vars: HashMap<String, String>) -> Result<Self> {
        let mut config = SenderConfig::default();

        if let Some(name) = vars.get(ENV_SENDER_NAME) {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("{ENV_SENDER_NAME} is empty")));
            }
            config.name = name.trim().to_string();
        }

        if let Some(stack_size) = vars.get(ENV_SENDER_STACK_SIZE) {
            let stack_size = stack_size.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!(
                    "Invalid {ENV_SENDER_STACK_SIZE} {stack_size:?}: {e}"
                ))
            })?;
            if stack_size == 0 {
                return Err(Error::Config(format!(
                    "{ENV_SENDER_STACK_SIZE} must be greater than zero"
                )));
            }
            config.stack_size = Some(stack_size);
        }

        config.validate()?;
        Ok(config)
    }
}
