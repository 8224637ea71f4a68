use std::fmt::Display;

#[derive(Debug)]
pub struct FluentdServiceError {
    pub who: Option<String>,
    pub error: String,
}

impl FluentdServiceError {
    pub fn from_string(error: String) -> Self {
        FluentdServiceError { error, who: None }
    }

    /// Adapter for `map_err` that prefixes the underlying error message.
    pub fn from_error<E: Display>(prefix: &str) -> impl Fn(E) -> Self + '_ {
        move |e: E| FluentdServiceError::from_string(format!("{}: {}", prefix, e))
    }

    pub fn with_service(self, who: String) -> Self {
        FluentdServiceError {
            error: self.error,
            who: Some(who),
        }
    }
}

impl Display for FluentdServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.who {
            Some(who) => write!(f, "FluentdInjector [{}] error: {}", who, self.error),
            None => write!(f, "FluentdInjector error: {}", self.error),
        }
    }
}

impl std::error::Error for FluentdServiceError {}

impl From<&str> for FluentdServiceError {
    fn from(error: &str) -> Self {
        FluentdServiceError::from_string(error.to_string())
    }
}

impl From<String> for FluentdServiceError {
    fn from(error: String) -> Self {
        FluentdServiceError::from_string(error)
    }
}

impl From<serde_json::error::Error> for FluentdServiceError {
    fn from(error: serde_json::error::Error) -> Self {
        FluentdServiceError::from_string(error.to_string())
    }
}
