use log::{debug, info, warn};

/// Log front end that tags every line with the product being decoded.
#[derive(Debug, Clone, Default)]
pub struct LogManager {
    scope: Option<String>,
}

impl LogManager {
    pub fn new() -> Self {
        Self { scope: None }
    }

    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
        }
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn record(&self, message: &str) {
        info!("{}", self.tag(message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.tag(message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.tag(message));
    }

    fn tag(&self, message: &str) -> String {
        match &self.scope {
            Some(scope) => format!("[{}] {}", scope, message),
            None => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_lines_carry_the_file_name() {
        let logger = LogManager::scoped("CS_OFFL_SIR_SAR_1B.DBL");
        assert_eq!(logger.tag("decoded"), "[CS_OFFL_SIR_SAR_1B.DBL] decoded");
        assert_eq!(LogManager::new().tag("decoded"), "decoded");
    }
}
