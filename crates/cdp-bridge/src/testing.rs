//! In-memory [`PageDriver`] double for exercising the resolver, catalog and
//! executor pipelines without a browser.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::driver::PageDriver;
use crate::error::DriverError;

type EvalFn = Box<dyn FnMut(&str) -> Option<Result<Value, DriverError>> + Send>;

#[derive(Default)]
struct FakeState {
    url: String,
    title: String,
    content: String,
    inputs: HashMap<String, String>,
    calls: Vec<String>,
    fail_counts: HashMap<&'static str, (usize, DriverError)>,
    screenshot: Vec<u8>,
}

/// Scriptable fake page. Tests install an eval handler that answers the
/// in-page scripts the production code emits, and inspect the recorded call
/// log afterwards.
pub struct FakePageDriver {
    state: Mutex<FakeState>,
    eval_fn: Mutex<Option<EvalFn>>,
}

impl Default for FakePageDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePageDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                url: "about:blank".to_string(),
                title: String::new(),
                content: "<html><body></body></html>".to_string(),
                screenshot: vec![0x89, b'P', b'N', b'G'],
                ..FakeState::default()
            }),
            eval_fn: Mutex::new(None),
        }
    }

    /// Install the script responder. Returning `None` falls back to
    /// `Value::Null`, matching a page that has nothing to say.
    pub fn set_eval_handler(
        &self,
        handler: impl FnMut(&str) -> Option<Result<Value, DriverError>> + Send + 'static,
    ) {
        *self.eval_fn.lock() = Some(Box::new(handler));
    }

    /// Make the named driver method fail `times` times before recovering.
    pub fn fail_times(&self, method: &'static str, times: usize, err: DriverError) {
        self.state.lock().fail_counts.insert(method, (times, err));
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    pub fn set_content(&self, content: &str) {
        self.state.lock().content = content.to_string();
    }

    /// Pre-seed an input's value, e.g. to model autocomplete interference.
    pub fn set_input(&self, css: &str, value: &str) {
        self.state.lock().inputs.insert(css.to_string(), value.to_string());
    }

    pub fn input(&self, css: &str) -> Option<String> {
        self.state.lock().inputs.get(css).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }

    fn check_fail(&self, method: &'static str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if let Some((remaining, err)) = state.fail_counts.get_mut(method) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakePageDriver {
    async fn navigate(
        &self,
        url: &str,
        wait_until: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        self.record(format!("navigate:{url}:{wait_until}"));
        self.check_fail("navigate")?;
        self.state.lock().url = url.to_string();
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        self.record(format!("evaluate:{}", script.chars().take(60).collect::<String>()));
        self.check_fail("evaluate")?;
        let mut guard = self.eval_fn.lock();
        if let Some(handler) = guard.as_mut() {
            if let Some(result) = handler(script) {
                return result;
            }
        }
        Ok(Value::Null)
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.record("content".to_string());
        self.check_fail("content")?;
        Ok(self.state.lock().content.clone())
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.check_fail("title")?;
        Ok(self.state.lock().title.clone())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot".to_string());
        self.check_fail("screenshot")?;
        Ok(self.state.lock().screenshot.clone())
    }

    async fn click_css(&self, css: &str) -> Result<(), DriverError> {
        self.record(format!("click:{css}"));
        self.check_fail("click")?;
        Ok(())
    }

    async fn fill_css(&self, css: &str, value: &str) -> Result<(), DriverError> {
        self.record(format!("fill:{css}={value}"));
        self.check_fail("fill")?;
        self.state
            .lock()
            .inputs
            .insert(css.to_string(), value.to_string());
        Ok(())
    }

    async fn type_chars(&self, css: &str, text: &str, _delay: Duration) -> Result<(), DriverError> {
        self.record(format!("type_chars:{css}={text}"));
        self.check_fail("type_chars")?;
        let mut state = self.state.lock();
        let entry = state.inputs.entry(css.to_string()).or_default();
        entry.push_str(text);
        Ok(())
    }

    async fn input_value(&self, css: &str) -> Result<String, DriverError> {
        self.check_fail("input_value")?;
        self.state
            .lock()
            .inputs
            .get(css)
            .cloned()
            .ok_or_else(|| DriverError::TargetNotFound(css.to_string()))
    }

    async fn hover_css(&self, css: &str) -> Result<(), DriverError> {
        self.record(format!("hover:{css}"));
        self.check_fail("hover")?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.record(format!("press:{key}"));
        self.check_fail("press")?;
        Ok(())
    }

    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.record(format!("mouse_move:{x},{y}"));
        Ok(())
    }

    async fn mouse_click(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.record(format!("mouse_click:{x},{y}"));
        self.check_fail("mouse_click")?;
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError> {
        self.record(format!("scroll_by:{dx},{dy}"));
        self.check_fail("scroll_by")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_inputs() {
        let fake = FakePageDriver::new();
        fake.fill_css("#q", "箱根").await.unwrap();
        assert_eq!(fake.input("#q").as_deref(), Some("箱根"));
        assert_eq!(fake.call_count("fill:"), 1);
    }

    #[tokio::test]
    async fn fail_times_recovers() {
        let fake = FakePageDriver::new();
        fake.fail_times("click", 1, DriverError::Io("flake".into()));
        assert!(fake.click_css("#a").await.is_err());
        assert!(fake.click_css("#a").await.is_ok());
    }

    #[tokio::test]
    async fn eval_handler_answers_scripts() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script
                .contains("readyState")
                .then(|| Ok(Value::String("complete".into())))
        });
        let value = fake.evaluate("document.readyState").await.unwrap();
        assert_eq!(value, Value::String("complete".into()));
        assert_eq!(fake.evaluate("1 + 1").await.unwrap(), Value::Null);
    }
}
