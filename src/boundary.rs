use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("render panicked: {0}")]
    Panicked(String),
}

/// Isolates one independently failing region of a view.
///
/// Once a render fails, the region shows its fallback until [`Boundary::reset`]
/// or [`Boundary::retry`]; siblings are unaffected.
#[derive(Debug, Clone)]
pub struct Boundary {
    label: String,
    failure: Option<RenderError>,
    attempts: u32,
}

impl Boundary {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            failure: None,
            attempts: 0,
        }
    }

    pub fn render<F>(&mut self, render: F) -> String
    where
        F: FnOnce() -> Result<String, RenderError>,
    {
        if self.failure.is_some() {
            return self.fallback();
        }

        self.attempts += 1;

        let result = catch_unwind(AssertUnwindSafe(render))
            .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(label = %self.label, error = %e, "Render failed, showing fallback");
                self.failure = Some(e);
                self.fallback()
            }
        }
    }

    pub fn reset(&mut self) {
        self.failure = None;
    }

    pub fn retry<F>(&mut self, render: F) -> String
    where
        F: FnOnce() -> Result<String, RenderError>,
    {
        self.reset();
        self.render(render)
    }

    pub fn failure(&self) -> Option<&RenderError> {
        self.failure.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn fallback(&self) -> String {
        match &self.failure {
            Some(e) => format!("[{}] Something went wrong ({e}). Retry to reload.", self.label),
            None => format!("[{}] Something went wrong. Retry to reload.", self.label),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_render() {
        let mut boundary = Boundary::new("card");

        assert_eq!(boundary.render(|| Ok("ok".to_string())), "ok");
        assert!(boundary.failure().is_none());
    }

    #[test]
    fn test_error_contained_until_retry() {
        let mut boundary = Boundary::new("card");

        let output = boundary.render(|| Err(RenderError::MissingField("identifier")));
        assert!(output.contains("missing identifier"));

        let output = boundary.render(|| Ok("ok".to_string()));
        assert!(output.starts_with("[card]"));
        assert_eq!(boundary.attempts(), 1);

        assert_eq!(boundary.retry(|| Ok("ok".to_string())), "ok");
        assert_eq!(boundary.attempts(), 2);
    }

    #[test]
    fn test_panic_contained() {
        let mut boundary = Boundary::new("card");

        let output = boundary.render(|| panic!("bad layout"));

        assert!(output.contains("bad layout"));
        assert_eq!(
            boundary.failure(),
            Some(&RenderError::Panicked("bad layout".to_string()))
        );
    }
}
