//! Plan orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_dsl::{
    actions::{LoadState, ScrollDirection, ScrollTo, WaitCondition},
    validate_plan, Action, AssertState, ExtractAttr, KeyScope, Registry, Selector,
};
use cdp_bridge::driver::SelectorState;
use cdp_bridge::PageDriver;
use chrono::Utc;
use element_catalog::{rebind_index, CatalogBuilder, CatalogError, ElementCatalog};
use page_interactions::{
    primitives, safe_page_content, stabilize_page, wait_page_ready, StabilityBudget,
};
use parking_lot::Mutex;
use selector_resolver::{ResolvedNode, SelectorResolver, StableNodeStore};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use webpilot_core_types::RunId;

use crate::config::RunConfig;
use crate::events::{EventWriter, StructuredEvent};
use crate::outcome::{ActionOutcome, ResolvedSummary, StepError};
use crate::retry::backoff_delay;

/// Aggregated result of one run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub correlation_id: String,
    pub success: bool,
    pub cancelled: bool,
    pub results: Vec<ActionOutcome>,
    pub warnings: Vec<String>,
    pub html: String,
    pub url: String,
    pub observation: Value,
    pub error: Option<Value>,
    pub is_done: bool,
    pub extracted: Vec<String>,
    pub eval_results: Vec<Value>,
    pub log_path: Option<String>,
}

impl RunSummary {
    fn rejected(run_id: RunId, code: &str, message: String) -> Self {
        Self {
            run_id,
            correlation_id: short_hex(),
            success: false,
            cancelled: false,
            results: Vec::new(),
            warnings: Vec::new(),
            html: String::new(),
            url: String::new(),
            observation: Value::Null,
            error: Some(json!({ "code": code, "message": message })),
            is_done: true,
            extracted: Vec::new(),
            eval_results: Vec::new(),
            log_path: None,
        }
    }

    /// Wire form. `complete` always mirrors `is_done` for legacy clients.
    pub fn to_payload(&self) -> Value {
        json!({
            "run_id": self.run_id.as_str(),
            "correlation_id": self.correlation_id,
            "success": self.success,
            "cancelled": self.cancelled,
            "results": self.results,
            "warnings": self.warnings,
            "html": self.html,
            "url": self.url,
            "observation": self.observation,
            "error": self.error,
            "is_done": self.is_done,
            "complete": self.is_done,
            "extracted": self.extracted,
            "eval_results": self.eval_results,
            "log_path": self.log_path,
        })
    }
}

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Callback invoked after every finalized step.
pub type StepObserver<'a> = &'a (dyn Fn(u32, &ActionOutcome) + Send + Sync);

struct StepCtx<'a> {
    config: &'a RunConfig,
    cancel: &'a CancellationToken,
    shots_dir: &'a Path,
    step: u32,
    warnings: &'a mut Vec<String>,
    extracted: &'a mut Vec<String>,
    eval_results: &'a mut Vec<Value>,
    stop_requested: &'a mut bool,
    nav_detected: &'a mut bool,
}

/// Executes parsed plans against one shared page. One executor lives per
/// session; its catalog and stable-id store are session state.
pub struct RunExecutor {
    driver: Arc<dyn PageDriver>,
    store: Arc<StableNodeStore>,
    resolver: SelectorResolver,
    catalog_builder: CatalogBuilder,
    registry: Registry,
    runs_root: PathBuf,
    allowed_domains: Vec<String>,
    last_catalog: Mutex<Option<ElementCatalog>>,
}

impl RunExecutor {
    pub fn new(driver: Arc<dyn PageDriver>, runs_root: PathBuf, allowed_domains: Vec<String>) -> Self {
        let store = Arc::new(StableNodeStore::new());
        Self {
            resolver: SelectorResolver::new(driver.clone(), store.clone()),
            catalog_builder: CatalogBuilder::new(driver.clone()),
            registry: Registry::new(),
            driver,
            store,
            runs_root,
            allowed_domains,
            last_catalog: Mutex::new(None),
        }
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn last_catalog(&self) -> Option<ElementCatalog> {
        self.last_catalog.lock().clone()
    }

    /// Collect a fresh catalog outside of any run (the `/catalog` surface).
    pub async fn refresh_catalog_now(&self) -> Result<ElementCatalog, CatalogError> {
        let fresh = self.catalog_builder.collect(Some(&self.store)).await?;
        *self.last_catalog.lock() = Some(fresh.clone());
        Ok(fresh)
    }

    /// Execute one payload end to end.
    pub async fn run(&self, payload: &Value, cancel: &CancellationToken) -> RunSummary {
        self.run_observed(payload, cancel, None).await
    }

    /// Like [`Self::run`], invoking `observer` after every finalized step so
    /// callers (the session manager) can surface progress live.
    pub async fn run_observed(
        &self,
        payload: &Value,
        cancel: &CancellationToken,
        observer: Option<StepObserver<'_>>,
    ) -> RunSummary {
        let request = match self.registry.parse_run_request(payload) {
            Ok(request) => request,
            Err(err) => {
                return RunSummary::rejected(RunId::generate(), err.code(), err.to_string())
            }
        };
        let run_id = request.run_id.clone();
        let config = RunConfig::from_map(&request.config);
        let correlation_id = request.correlation_id.clone().unwrap_or_else(short_hex);

        info!(
            target: "run-executor",
            run_id = %run_id,
            steps = request.plan.len(),
            "starting run"
        );

        let run_dir = self.runs_root.join(run_id.as_str());
        let shots_dir = run_dir.join("shots");
        if let Err(err) = std::fs::create_dir_all(&shots_dir) {
            return RunSummary::rejected(run_id, "EXECUTION_ERROR", err.to_string());
        }
        let mut writer = match EventWriter::create(&run_dir.join("events.jsonl")) {
            Ok(writer) => writer,
            Err(err) => return RunSummary::rejected(run_id, "EXECUTION_ERROR", err.to_string()),
        };
        let log_path = writer.path().to_string_lossy().to_string();

        let mut warnings = match validate_plan(&request.plan, &self.allowed_domains) {
            Ok(report) => report.warnings,
            Err(err) => {
                let mut summary = RunSummary::rejected(run_id, err.code(), err.to_string());
                summary.correlation_id = correlation_id;
                summary.log_path = Some(log_path);
                return summary;
            }
        };

        if let Err(step_err) = self.dry_run(&request.plan).await {
            self.write_error_report(&run_dir, &step_err);
            let mut summary = RunSummary::rejected(
                request.run_id.clone(),
                &step_err.code,
                step_err.message.clone(),
            );
            summary.correlation_id = correlation_id;
            summary.log_path = Some(log_path);
            return summary;
        }

        let plan = {
            let (plan, notes) = augment_plan(request.plan, &config);
            warnings.extend(notes);
            plan
        };

        let budget = StabilityBudget::from_millis(config.stabilize_timeout_ms);
        let mut results: Vec<ActionOutcome> = Vec::new();
        let mut extracted: Vec<String> = Vec::new();
        let mut eval_results: Vec<Value> = Vec::new();
        let mut stop_requested = false;
        let mut cancelled = false;
        let mut nav_detected = false;
        let mut error_payload: Option<Value> = None;
        let mut previous_mutating = false;

        for (step, planned) in plan.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            stabilize_page(&self.driver, budget).await;

            let mut action = planned.clone();
            let mut step_warnings: Vec<String> = Vec::new();

            // Ordinal targets go through the catalog before resolution.
            if let Err(step_err) = self
                .prepare_ordinal_target(&mut action, &request.metadata, previous_mutating, &mut step_warnings)
                .await
            {
                let mut outcome = ActionOutcome::failure(action.name(), &step_err, 1);
                outcome.warnings = step_warnings;
                self.finalize_step(
                    &mut writer, &shots_dir, &run_id, step as u32, &action, &outcome,
                )
                .await;
                if let Some(observer) = observer {
                    observer(step as u32, &outcome);
                }
                if error_payload.is_none() {
                    error_payload = Some(step_err.to_error_value());
                    self.write_error_report(&run_dir, &step_err);
                }
                results.push(outcome);
                if config.stop_on_failure {
                    break;
                }
                previous_mutating = action.is_dom_mutating();
                continue;
            }

            let mut ctx_warnings = step_warnings;
            let outcome = {
                let mut ctx = StepCtx {
                    config: &config,
                    cancel,
                    shots_dir: &shots_dir,
                    step: step as u32,
                    warnings: &mut ctx_warnings,
                    extracted: &mut extracted,
                    eval_results: &mut eval_results,
                    stop_requested: &mut stop_requested,
                    nav_detected: &mut nav_detected,
                };
                self.execute_with_retry(&action, &mut ctx).await
            };

            stabilize_page(&self.driver, budget).await;
            self.finalize_step(&mut writer, &shots_dir, &run_id, step as u32, &action, &outcome)
                .await;
            if let Some(observer) = observer {
                observer(step as u32, &outcome);
            }

            let failed = !outcome.ok;
            if failed && error_payload.is_none() {
                error_payload = Some(json!({
                    "code": outcome.error_code,
                    "message": outcome.error,
                    "details": outcome.error_details,
                }));
                let step_err = StepError::new(
                    outcome.error_code.clone().unwrap_or_else(|| "EXECUTION_ERROR".into()),
                    outcome.error.clone().unwrap_or_default(),
                );
                self.write_error_report(&run_dir, &step_err);
            }
            previous_mutating = action.is_dom_mutating();
            results.push(outcome);

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if stop_requested {
                debug!(target: "run-executor", run_id = %run_id, step, "stop requested; breaking");
                break;
            }
            if failed && config.stop_on_failure {
                break;
            }
        }

        let html = safe_page_content(&self.driver).await;
        let url = self.driver.url().await.unwrap_or_default();
        let title = self.driver.title().await.unwrap_or_default();
        let catalog_version = self
            .last_catalog
            .lock()
            .as_ref()
            .map(|catalog| catalog.catalog_version.clone());

        let success = !cancelled && results.iter().all(|outcome| outcome.ok);
        for outcome in &results {
            warnings.extend(outcome.warnings.iter().cloned());
        }

        RunSummary {
            run_id,
            correlation_id,
            success,
            cancelled,
            results,
            warnings,
            html,
            url: url.clone(),
            observation: json!({
                "url": url,
                "title": title,
                "catalog_version": catalog_version,
                "nav_detected": nav_detected,
            }),
            error: error_payload,
            is_done: !stop_requested && !cancelled,
            extracted,
            eval_results,
            log_path: Some(log_path),
        }
    }

    /// Resolve the selectors of actions that target the page as it is now.
    /// Selectors that only exist after an in-plan navigation cannot be
    /// checked without side effects, so the dry-run stops at the first
    /// `navigate`.
    async fn dry_run(&self, plan: &[Action]) -> Result<(), StepError> {
        for (step, action) in plan.iter().enumerate() {
            if matches!(action, Action::Navigate { .. }) {
                break;
            }
            let selector = match action.selector() {
                Some(selector) => selector,
                None => continue,
            };
            // Ordinal-only selectors are checked against the catalog at
            // execution time instead.
            if selector.index.is_some() && selector.css.is_none() && selector.xpath.is_none() {
                continue;
            }
            match self.resolver.resolve(selector).await {
                Ok(_) => {}
                Err(selector_resolver::ResolverError::ResolutionFailed {
                    selector,
                    attempted,
                    ..
                }) => {
                    return Err(StepError::new(
                        "DRY_RUN_FAIL",
                        format!("dry-run could not resolve {selector} at step {step}"),
                    )
                    .with_details(json!({ "step": step, "attempted": attempted })));
                }
                // Transient driver trouble during dry-run is not a plan
                // defect; execution will surface it if it persists.
                Err(err) => {
                    debug!(target: "run-executor", %err, step, "dry-run probe error ignored");
                }
            }
        }
        Ok(())
    }

    async fn prepare_ordinal_target(
        &self,
        action: &mut Action,
        metadata: &Map<String, Value>,
        previous_mutating: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), StepError> {
        let wants_index = action
            .selector()
            .and_then(|selector| selector.index)
            .is_some();
        if !wants_index {
            return Ok(());
        }

        let expected = metadata
            .get("expected_catalog_version")
            .and_then(Value::as_str)
            .map(str::to_string);

        // A referenced version always forces an observation of the live
        // catalog; otherwise only DOM mutation or a missing catalog does.
        let needs_refresh =
            previous_mutating || expected.is_some() || self.last_catalog.lock().is_none();
        if !needs_refresh {
            return Ok(());
        }

        let fresh = self.catalog_builder.collect(Some(&self.store)).await.map_err(StepError::from)?;

        if let Some(expected) = expected {
            if expected != fresh.catalog_version {
                let old = self.last_catalog.lock().clone();
                let rebound = old
                    .filter(|catalog| catalog.catalog_version == expected)
                    .and_then(|catalog| {
                        let index = action.selector().and_then(|s| s.index)?;
                        catalog.get(index).cloned()
                    })
                    .map(|entry| rebind_index(&entry, &fresh, &expected));

                match rebound {
                    Some(Ok(outcome)) => {
                        if let Some(selector) = action.selector_mut() {
                            selector.index = Some(outcome.new_index);
                        }
                        warnings.push(outcome.warning);
                    }
                    Some(Err(err)) => {
                        *self.last_catalog.lock() = Some(fresh);
                        return Err(err.into());
                    }
                    None => {
                        let current = fresh.catalog_version.clone();
                        *self.last_catalog.lock() = Some(fresh);
                        return Err(CatalogError::CatalogOutdated { expected, current }.into());
                    }
                }
            }
        }

        // The index must exist and be interactable in the live catalog.
        if let Some(index) = action.selector().and_then(|selector| selector.index) {
            CatalogBuilder::lookup(&fresh, index).map_err(StepError::from)?;
        }
        *self.last_catalog.lock() = Some(fresh);
        Ok(())
    }

    async fn execute_with_retry(&self, action: &Action, ctx: &mut StepCtx<'_>) -> ActionOutcome {
        let max_attempts = ctx.config.max_retries + 1;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut warnings = std::mem::take(ctx.warnings);
            match self.dispatch(action, ctx, &mut warnings).await {
                Ok((details, resolved)) => {
                    let mut outcome = ActionOutcome::success(action.name(), details, attempt);
                    outcome.resolved = resolved;
                    outcome.warnings = warnings;
                    return outcome;
                }
                Err(step_err) => {
                    let cancelled = ctx.cancel.is_cancelled();
                    if step_err.retryable && attempt < max_attempts && !cancelled {
                        let delay = backoff_delay(attempt, ctx.config);
                        warn!(
                            target: "run-executor",
                            action = action.name(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %step_err.message,
                            "step failed; backing off before retry"
                        );
                        warnings.push(format!(
                            "{}: attempt {attempt} failed ({}); retrying",
                            action.name(),
                            step_err.code
                        ));
                        *ctx.warnings = warnings;
                        if cancellable_sleep(delay, ctx.cancel).await {
                            let mut outcome =
                                ActionOutcome::failure(action.name(), &step_err, attempt);
                            outcome.warnings = std::mem::take(ctx.warnings);
                            return outcome;
                        }
                        continue;
                    }
                    let mut outcome = ActionOutcome::failure(action.name(), &step_err, attempt);
                    outcome.warnings = warnings;
                    return outcome;
                }
            }
        }
    }

    async fn resolve_selector(
        &self,
        selector: &Selector,
    ) -> Result<ResolvedNode, StepError> {
        self.resolver.resolve(selector).await.map_err(StepError::from)
    }

    async fn dispatch(
        &self,
        action: &Action,
        ctx: &mut StepCtx<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<(Map<String, Value>, Option<ResolvedSummary>), StepError> {
        let action_timeout = Duration::from_millis(ctx.config.action_timeout_ms);
        let mut details = Map::new();

        match action {
            Action::Navigate { url, wait_for } => {
                let wait_until = match wait_for {
                    Some(WaitCondition::ForState { state }) => state.as_str(),
                    _ => LoadState::Load.as_str(),
                };
                self.driver
                    .navigate(
                        url,
                        wait_until,
                        Duration::from_millis(ctx.config.navigation_timeout_ms),
                    )
                    .await
                    .map_err(|err| match err {
                        cdp_bridge::DriverError::Timeout(message) => {
                            StepError::new("NAVIGATION_TIMEOUT", message)
                        }
                        other => StepError::from(other),
                    })?;

                match wait_for {
                    Some(WaitCondition::ForTimeout { timeout_ms }) => {
                        if cancellable_sleep(Duration::from_millis(*timeout_ms), ctx.cancel).await {
                            return Err(cancelled_error());
                        }
                    }
                    Some(WaitCondition::ForSelector { selector, state }) => {
                        self.wait_selector_condition(selector, *state, ctx.config.wait_timeout_ms, ctx.cancel)
                            .await?;
                    }
                    _ => {}
                }

                wait_page_ready(
                    &self.driver,
                    StabilityBudget::from_millis(ctx.config.stabilize_timeout_ms),
                )
                .await;
                *ctx.nav_detected = true;
                details.insert("url".into(), json!(url));
                details.insert("wait_until".into(), json!(wait_until));
                Ok((details, None))
            }

            Action::Click { selector, .. } => {
                let node = self.resolve_selector(selector).await?;
                primitives::click(&self.driver, &node.dom_path, action_timeout, warnings)
                    .await
                    .map_err(StepError::from)?;
                details.insert("dom_path".into(), json!(node.dom_path));
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::Hover { selector } => {
                let node = self.resolve_selector(selector).await?;
                primitives::hover(&self.driver, &node.dom_path, warnings)
                    .await
                    .map_err(StepError::from)?;
                details.insert("dom_path".into(), json!(node.dom_path));
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::Type {
                selector,
                text,
                press_enter,
                clear: _,
            } => {
                let node = self.resolve_selector(selector).await?;
                primitives::fill(&self.driver, &node.dom_path, text, warnings)
                    .await
                    .map_err(StepError::from)?;
                if *press_enter {
                    primitives::press_key(
                        &self.driver,
                        &["Enter".to_string()],
                        primitives::KeyPressScope::ActiveElement,
                        warnings,
                    )
                    .await
                    .map_err(StepError::from)?;
                }
                details.insert("text".into(), json!(text));
                details.insert("press_enter".into(), json!(press_enter));
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::Search { selector, text } => {
                let node = self.resolve_selector(selector).await?;
                primitives::fill(&self.driver, &node.dom_path, text, warnings)
                    .await
                    .map_err(StepError::from)?;
                primitives::press_key(
                    &self.driver,
                    &["Enter".to_string()],
                    primitives::KeyPressScope::ActiveElement,
                    warnings,
                )
                .await
                .map_err(StepError::from)?;
                *ctx.nav_detected = true;
                details.insert("text".into(), json!(text));
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::Select {
                selector,
                value_or_label,
            } => {
                let node = self.resolve_selector(selector).await?;
                primitives::select_option(&self.driver, &node.dom_path, value_or_label, warnings)
                    .await
                    .map_err(StepError::from)?;
                details.insert("value_or_label".into(), json!(value_or_label));
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::PressKey { keys, scope } => {
                let press_scope = match scope {
                    KeyScope::ActiveElement => primitives::KeyPressScope::ActiveElement,
                    KeyScope::Page => primitives::KeyPressScope::Page,
                };
                primitives::press_key(&self.driver, keys, press_scope, warnings)
                    .await
                    .map_err(StepError::from)?;
                details.insert("keys".into(), json!(keys));
                Ok((details, None))
            }

            Action::Wait {
                condition,
                timeout_ms,
            } => {
                match condition {
                    None => {
                        if cancellable_sleep(Duration::from_millis(*timeout_ms), ctx.cancel).await {
                            return Err(cancelled_error());
                        }
                        details.insert("timeout_ms".into(), json!(timeout_ms));
                    }
                    Some(WaitCondition::ForTimeout { timeout_ms }) => {
                        if cancellable_sleep(Duration::from_millis(*timeout_ms), ctx.cancel).await {
                            return Err(cancelled_error());
                        }
                        details.insert("timeout_ms".into(), json!(timeout_ms));
                    }
                    Some(WaitCondition::ForState { state }) => {
                        stabilize_page(
                            &self.driver,
                            StabilityBudget::from_millis(*timeout_ms),
                        )
                        .await;
                        details.insert("state".into(), json!(state.as_str()));
                    }
                    Some(WaitCondition::ForSelector { selector, state }) => {
                        self.wait_selector_condition(selector, *state, *timeout_ms, ctx.cancel)
                            .await?;
                        details.insert("state".into(), json!(state.as_str()));
                    }
                }
                Ok((details, None))
            }

            Action::SubmitForm { selector } => {
                let (form_css, resolved) = match selector {
                    Some(selector) => {
                        let node = self.resolve_selector(selector).await?;
                        (node.dom_path.clone(), Some(ResolvedSummary::from(&node)))
                    }
                    None => ("form".to_string(), None),
                };
                let quoted = serde_json::to_string(&form_css)
                    .map_err(|err| StepError::new("EXECUTION_ERROR", err.to_string()))?;
                let submitted = self
                    .driver
                    .evaluate(&format!(
                        r#"(() => {{
                            const el = document.querySelector({quoted});
                            if (!el) return false;
                            const form = el.tagName.toLowerCase() === "form" ? el : el.closest("form");
                            if (!form) return false;
                            if (form.requestSubmit) form.requestSubmit(); else form.submit();
                            return true;
                        }})()"#
                    ))
                    .await
                    .map_err(StepError::from)?;
                if submitted != Value::Bool(true) {
                    return Err(StepError::new(
                        "ELEMENT_NOT_FOUND",
                        format!("no form found for {form_css}"),
                    ));
                }
                *ctx.nav_detected = true;
                details.insert("form".into(), json!(form_css));
                Ok((details, resolved))
            }

            Action::Scroll {
                to,
                direction,
                container,
            } => {
                match (to, direction, container) {
                    (Some(ScrollTo::Amount(amount)), _, None) => {
                        primitives::scroll_by_amount(&self.driver, *amount)
                            .await
                            .map_err(StepError::from)?;
                        details.insert("amount".into(), json!(amount));
                    }
                    (Some(ScrollTo::Edge(edge)), _, _) => {
                        primitives::scroll_to_edge(
                            &self.driver,
                            matches!(edge, action_dsl::ScrollEdge::Top),
                        )
                        .await
                        .map_err(StepError::from)?;
                        details.insert("edge".into(), json!(edge.as_str()));
                    }
                    (Some(ScrollTo::Target(target)), _, _) => {
                        let selector = target.selector.as_ref().ok_or_else(|| {
                            StepError::new("VALIDATION", "scroll target has no selector")
                        })?;
                        let node = self.resolve_selector(selector).await?;
                        primitives::scroll_to_selector(&self.driver, &node.dom_path)
                            .await
                            .map_err(StepError::from)?;
                        details.insert("dom_path".into(), json!(node.dom_path));
                    }
                    (Some(ScrollTo::Amount(amount)), _, Some(container)) => {
                        let node = self.resolve_selector(container).await?;
                        primitives::scroll_container(&self.driver, &node.dom_path, *amount)
                            .await
                            .map_err(StepError::from)?;
                        details.insert("container".into(), json!(node.dom_path));
                    }
                    (None, Some(direction), maybe_container) => {
                        let amount = match direction {
                            ScrollDirection::Down => 400,
                            ScrollDirection::Up => -400,
                        };
                        match maybe_container {
                            Some(container) => {
                                let node = self.resolve_selector(container).await?;
                                primitives::scroll_container(&self.driver, &node.dom_path, amount)
                                    .await
                                    .map_err(StepError::from)?;
                            }
                            None => {
                                primitives::scroll_by_amount(&self.driver, amount)
                                    .await
                                    .map_err(StepError::from)?;
                            }
                        }
                        details.insert("direction".into(), json!(direction.as_str()));
                    }
                    (None, None, Some(container)) => {
                        let node = self.resolve_selector(container).await?;
                        primitives::scroll_container(&self.driver, &node.dom_path, 400)
                            .await
                            .map_err(StepError::from)?;
                        details.insert("container".into(), json!(node.dom_path));
                    }
                    (None, None, None) => {
                        return Err(StepError::new(
                            "VALIDATION",
                            "scroll requires one of to/direction/container",
                        ));
                    }
                }
                Ok((details, None))
            }

            Action::ScrollToText { text } => {
                let found = primitives::scroll_to_text(&self.driver, text)
                    .await
                    .map_err(StepError::from)?;
                if !found {
                    return Err(StepError::new(
                        "ELEMENT_NOT_FOUND",
                        format!("text '{text}' not found while scrolling"),
                    ));
                }
                details.insert("text".into(), json!(text));
                Ok((details, None))
            }

            Action::SwitchTab { .. } => Err(StepError::new(
                "UNSUPPORTED_ACTION",
                "tab switching is not available on the shared single-target browser",
            )),

            Action::FocusIframe { .. } => Err(StepError::new(
                "UNSUPPORTED_ACTION",
                "iframe focus is not available on the shared single-target browser",
            )),

            Action::RefreshCatalog => {
                let fresh = self
                    .catalog_builder
                    .collect(Some(&self.store))
                    .await
                    .map_err(StepError::from)?;
                details.insert("catalog_version".into(), json!(fresh.catalog_version));
                details.insert("entries".into(), json!(fresh.entries.len()));
                *self.last_catalog.lock() = Some(fresh);
                Ok((details, None))
            }

            Action::EvalJs { script } => {
                let value = self.driver.evaluate(script).await.map_err(StepError::from)?;
                ctx.eval_results.push(value.clone());
                details.insert("result".into(), value);
                Ok((details, None))
            }

            Action::ClickBlankArea => {
                self.driver.click_css("body").await.map_err(StepError::from)?;
                details.insert("target".into(), json!("body"));
                Ok((details, None))
            }

            Action::ClosePopup => {
                let closed = self
                    .driver
                    .evaluate(
                        r#"(() => {
                            const candidates = document.querySelectorAll(
                                "[aria-label*='close' i], [aria-label*='閉じる'], \
                                 .modal .close, .popup-close, button.close, [data-dismiss]");
                            for (const el of candidates) {
                                const style = window.getComputedStyle(el);
                                if (style.display === "none" || style.visibility === "hidden") continue;
                                el.click();
                                return true;
                            }
                            return false;
                        })()"#,
                    )
                    .await
                    .map_err(StepError::from)?;
                if closed != Value::Bool(true) {
                    warnings.push("close_popup: no visible popup close control found".to_string());
                }
                details.insert("closed".into(), json!(closed == Value::Bool(true)));
                Ok((details, None))
            }

            Action::Stop { reason, message } => {
                *ctx.stop_requested = true;
                details.insert("reason".into(), json!(reason));
                details.insert("message".into(), json!(message));
                Ok((details, None))
            }

            Action::Screenshot {
                mode,
                selector,
                file_name,
            } => {
                let resolved = match selector {
                    Some(selector) => Some(self.resolve_selector(selector).await?),
                    None => None,
                };
                let bytes = self.driver.screenshot_png().await.map_err(StepError::from)?;
                let name = file_name
                    .clone()
                    .unwrap_or_else(|| format!("manual_step_{:04}.png", ctx.step));
                let path = ctx.shots_dir.join(&name);
                std::fs::write(&path, &bytes)
                    .map_err(|err| StepError::new("EXECUTION_ERROR", err.to_string()))?;
                details.insert("mode".into(), json!(mode.as_str()));
                details.insert("path".into(), json!(path.to_string_lossy()));
                details.insert("bytes".into(), json!(bytes.len()));
                Ok((details, resolved.as_ref().map(ResolvedSummary::from)))
            }

            Action::Extract { selector, attr } => {
                let node = self.resolve_selector(selector).await?;
                let quoted = serde_json::to_string(&node.dom_path)
                    .map_err(|err| StepError::new("EXECUTION_ERROR", err.to_string()))?;
                let getter = match attr {
                    ExtractAttr::Text => "el.innerText",
                    ExtractAttr::Value => "el.value",
                    ExtractAttr::Href => "el.getAttribute('href')",
                    ExtractAttr::Html => "el.innerHTML",
                };
                let value = self
                    .driver
                    .evaluate(&format!(
                        r#"(() => {{
                            const el = document.querySelector({quoted});
                            if (!el) return null;
                            return {getter} ?? "";
                        }})()"#
                    ))
                    .await
                    .map_err(StepError::from)?;
                if let Some(text) = value.as_str() {
                    ctx.extracted.push(text.to_string());
                }
                details.insert("attr".into(), json!(attr.as_str()));
                details.insert("value".into(), value);
                Ok((details, Some(ResolvedSummary::from(&node))))
            }

            Action::Assert { selector, state } => {
                self.wait_selector_condition(selector, *state, ctx.config.action_timeout_ms, ctx.cancel)
                    .await
                    .map_err(|err| {
                        StepError::new(
                            "ELEMENT_NOT_FOUND",
                            format!(
                                "assertion failed: {} never became {} ({})",
                                selector.describe(),
                                state.as_str(),
                                err.message
                            ),
                        )
                    })?;
                details.insert("state".into(), json!(state.as_str()));
                Ok((details, None))
            }
        }
    }

    /// Wait until `selector` reaches `state`. Plain CSS selectors go through
    /// the driver's poll; composite selectors poll the resolver.
    async fn wait_selector_condition(
        &self,
        selector: &Selector,
        state: AssertState,
        timeout_ms: u64,
        cancel: &CancellationToken,
    ) -> Result<(), StepError> {
        let timeout = Duration::from_millis(timeout_ms);
        let driver_state = match state {
            AssertState::Attached => SelectorState::Attached,
            AssertState::Detached => SelectorState::Detached,
            AssertState::Visible => SelectorState::Visible,
            AssertState::Hidden => SelectorState::Hidden,
        };

        if let Some(css) = &selector.css {
            return self
                .driver
                .wait_for_selector_state(css, driver_state, timeout)
                .await
                .map_err(|err| StepError::new("ACTION_TIMEOUT", err.to_string()));
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled_error());
            }
            let resolution = self.resolver.resolve(selector).await;
            let satisfied = match (&resolution, state) {
                (Ok(node), AssertState::Attached) | (Ok(node), AssertState::Visible) => self
                    .driver
                    .wait_for_selector_state(
                        &node.dom_path,
                        driver_state,
                        Duration::from_millis(100),
                    )
                    .await
                    .is_ok(),
                (Err(_), AssertState::Detached) | (Err(_), AssertState::Hidden) => true,
                (Ok(node), AssertState::Hidden) | (Ok(node), AssertState::Detached) => self
                    .driver
                    .wait_for_selector_state(
                        &node.dom_path,
                        driver_state,
                        Duration::from_millis(100),
                    )
                    .await
                    .is_ok(),
                (Err(_), _) => false,
            };
            if satisfied {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StepError::new(
                    "ACTION_TIMEOUT",
                    format!(
                        "{} did not reach state {} within {timeout_ms}ms",
                        selector.describe(),
                        state.as_str()
                    ),
                ));
            }
            if cancellable_sleep(Duration::from_millis(200), cancel).await {
                return Err(cancelled_error());
            }
        }
    }

    async fn finalize_step(
        &self,
        writer: &mut EventWriter,
        shots_dir: &Path,
        run_id: &RunId,
        step: u32,
        action: &Action,
        outcome: &ActionOutcome,
    ) {
        let screenshot_path = match self.driver.screenshot_png().await {
            Ok(bytes) => {
                let path = shots_dir.join(format!("step_{step:04}.png"));
                match std::fs::write(&path, &bytes) {
                    Ok(()) => Some(path.to_string_lossy().to_string()),
                    Err(err) => {
                        debug!(target: "run-executor", %err, "failed to persist step screenshot");
                        None
                    }
                }
            }
            Err(err) => {
                debug!(target: "run-executor", %err, "step screenshot unavailable");
                None
            }
        };

        let dom_digest_sha = {
            let html = safe_page_content(&self.driver).await;
            if html.is_empty() {
                None
            } else {
                Some(hex::encode(Sha256::digest(html.as_bytes()))[..16].to_string())
            }
        };

        let event = StructuredEvent {
            ts: Utc::now(),
            run_id: run_id.as_str().to_string(),
            step,
            action: action.payload(),
            resolved_selector: outcome
                .resolved
                .as_ref()
                .map(|resolved| serde_json::to_value(resolved).unwrap_or(Value::Null)),
            result: json!({ "ok": outcome.ok, "details": outcome.details }),
            warnings: outcome.warnings.clone(),
            error: outcome.error.clone(),
            retry_count: outcome.attempts.saturating_sub(1),
            dom_digest_sha,
            screenshot_path,
        };
        if let Err(err) = writer.append(&event) {
            warn!(target: "run-executor", %err, "failed to append structured event");
        }
    }

    fn write_error_report(&self, run_dir: &Path, error: &StepError) {
        let report = json!({
            "ts": Utc::now().to_rfc3339(),
            "error": error.to_error_value(),
        });
        let path = run_dir.join("error_report.json");
        if let Err(err) = std::fs::write(&path, report.to_string()) {
            warn!(target: "run-executor", %err, "failed to write error report");
        }
    }
}

fn cancelled_error() -> StepError {
    StepError::new("EXECUTION_ERROR", "run cancelled").non_retryable()
}

async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Insert an implicit visibility wait after every index-addressed click
/// whose following 1–2 actions carry no explicit wait of their own.
fn augment_plan(plan: Vec<Action>, config: &RunConfig) -> (Vec<Action>, Vec<String>) {
    let mut augmented = Vec::with_capacity(plan.len());
    let mut notes = Vec::new();

    for (position, action) in plan.iter().enumerate() {
        augmented.push(action.clone());

        let index_click = match action {
            Action::Click { selector, .. } => selector.index.map(|index| (selector.clone(), index)),
            _ => None,
        };
        let (selector, index) = match index_click {
            Some(pair) => pair,
            None => continue,
        };

        let has_explicit_wait = plan
            .iter()
            .skip(position + 1)
            .take(2)
            .any(Action::is_explicit_wait);
        if has_explicit_wait {
            continue;
        }

        augmented.push(Action::Wait {
            condition: Some(WaitCondition::ForSelector {
                selector,
                state: AssertState::Visible,
            }),
            timeout_ms: config.implicit_wait_ms(),
        });
        notes.push(format!(
            "inserted implicit wait after click on catalog index {index}"
        ));
    }

    (augmented, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use cdp_bridge::DriverError;

    fn quiet_page_handler(script: &str) -> Option<Result<Value, DriverError>> {
        if script.contains("readyState") {
            Some(Ok(json!("complete")))
        } else if script.contains("__wpMutationObserver")
            || script.contains("progressbar")
            || script.contains("for (const tag of")
        {
            Some(Ok(json!(true)))
        } else {
            None
        }
    }

    fn candidate(dom_path: &str, text: &str, ordinal: i64) -> Value {
        json!({
            "dom_path": dom_path, "visible": true, "clickable": true,
            "in_viewport": true, "text": text, "aria_label": "", "role": "",
            "bbox": [0.0, 0.0, 50.0, 20.0], "ordinal": ordinal,
        })
    }

    fn search_page_handler(script: &str) -> Option<Result<Value, DriverError>> {
        if let Some(result) = quiet_page_handler(script) {
            return Some(result);
        }
        if script.contains("querySelectorAll(\"#query\")") {
            return Some(Ok(json!({
                "candidates": [candidate("body > input:nth-of-type(1)", "", 0)],
                "anchor": null,
            })));
        }
        if script.contains("querySelectorAll(\"#search-btn\")") {
            return Some(Ok(json!({
                "candidates": [candidate("body > button:nth-of-type(1)", "検索", 1)],
                "anchor": null,
            })));
        }
        if script.contains("isEditable") {
            return Some(Ok(json!({ "path": "body > input:nth-of-type(1)", "rung": "self" })));
        }
        if script.contains("getComputedStyle") {
            // Selector-state polls used by click and waits.
            return Some(Ok(json!("visible")));
        }
        if script.contains("disabled !== true") {
            return Some(Ok(json!(true)));
        }
        Some(Ok(json!(true)))
    }

    fn executor_on(fake: FakePageDriver, dir: &tempfile::TempDir) -> RunExecutor {
        RunExecutor::new(Arc::new(fake), dir.path().to_path_buf(), Vec::new())
    }

    #[tokio::test]
    async fn search_form_scenario_succeeds_with_three_events() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(search_page_handler);
        let executor = executor_on(fake, &dir);

        let payload = json!({
            "run_id": "run-search",
            "plan": {"actions": [
                {"type": "navigate", "url": "https://shop.example/search"},
                {"type": "type", "selector": {"css": "#query"}, "text": "ノートPC"},
                {"type": "click", "selector": {"css": "#search-btn"}},
            ]},
        });

        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(summary.success, "summary: {:?}", summary.error);
        assert_eq!(summary.results.len(), 3);
        assert!(summary.error.is_none());

        let events = std::fs::read_to_string(dir.path().join("run-search/events.jsonl")).unwrap();
        assert_eq!(events.lines().count(), 3);
        let steps: Vec<u32> = events
            .lines()
            .map(|line| serde_json::from_str::<StructuredEvent>(line).unwrap().step)
            .collect();
        assert_eq!(steps, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_with_validation_code() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_on(FakePageDriver::new(), &dir);
        let summary = executor
            .run(&json!({"plan": {"actions": [{"type": "navigate"}]}}), &CancellationToken::new())
            .await;
        assert!(!summary.success);
        assert_eq!(summary.error.as_ref().unwrap()["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn unknown_action_reports_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_on(FakePageDriver::new(), &dir);
        let summary = executor
            .run(&json!({"actions": [{"action": "teleport"}]}), &CancellationToken::new())
            .await;
        assert_eq!(summary.error.as_ref().unwrap()["code"], "UNSUPPORTED_ACTION");
    }

    #[tokio::test]
    async fn dry_run_failure_stops_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("querySelectorAll(\"#ghost\")") {
                Some(Ok(json!({ "candidates": [], "anchor": null })))
            } else {
                quiet_page_handler(script).or(Some(Ok(json!(true))))
            }
        });
        let executor = executor_on(fake, &dir);

        let summary = executor
            .run(
                &json!({"run_id": "run-dry", "actions": [
                    {"type": "click", "selector": {"css": "#ghost"}},
                ]}),
                &CancellationToken::new(),
            )
            .await;
        assert!(!summary.success);
        assert_eq!(summary.error.as_ref().unwrap()["code"], "DRY_RUN_FAIL");
        assert!(summary.results.is_empty());
        // The error report lands beside the (empty) event log.
        assert!(dir.path().join("run-dry/error_report.json").exists());
    }

    #[tokio::test]
    async fn transient_failures_retry_and_count_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(search_page_handler);
        fake.fail_times("scroll_by", 2, DriverError::Io("flaky".into()));
        let executor = executor_on(fake, &dir);

        let payload = json!({
            "run_id": "run-retry",
            "config": {"retry_backoff_base_ms": 10, "retry_jitter_ms": 0},
            "actions": [{"type": "scroll", "to": 200}],
        });
        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(summary.success);
        assert_eq!(summary.results[0].attempts, 3);
        assert!(summary
            .warnings
            .iter()
            .any(|warning| warning.contains("retrying")));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(search_page_handler);
        fake.fail_times("scroll_by", 99, DriverError::Io("dead".into()));
        let executor = executor_on(fake, &dir);

        let payload = json!({
            "run_id": "run-exhaust",
            "config": {"max_retries": 1, "retry_backoff_base_ms": 5, "retry_jitter_ms": 0},
            "actions": [{"type": "scroll", "to": 200}],
        });
        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(!summary.success);
        assert_eq!(summary.results[0].attempts, 2);
        assert!(dir.path().join("run-exhaust/error_report.json").exists());
    }

    #[tokio::test]
    async fn stop_action_halts_the_remaining_plan() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(search_page_handler);
        let executor = executor_on(fake, &dir);

        let payload = json!({
            "run_id": "run-stop",
            "actions": [
                {"type": "stop", "reason": "done"},
                {"type": "scroll", "to": 100},
            ],
        });
        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(summary.success);
        assert_eq!(summary.results.len(), 1);
        assert!(!summary.is_done);
    }

    #[tokio::test]
    async fn cancel_during_wait_leaves_only_pre_cancel_events() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(search_page_handler);
        let executor = Arc::new(executor_on(fake, &dir));

        let cancel = CancellationToken::new();
        let payload = json!({
            "run_id": "run-cancel",
            "actions": [
                {"type": "scroll", "to": 50},
                {"type": "wait", "for": {"timeout_ms": 30000}, "timeout_ms": 30000},
                {"type": "scroll", "to": 60},
            ],
        });

        let task = {
            let executor = executor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { executor.run(&payload, &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("cancel must unwind within 2s")
            .unwrap();

        assert!(summary.cancelled);
        assert!(!summary.success);
        // The scroll event and the finalized wait event are on disk; the
        // post-cancel scroll never ran.
        let events = std::fs::read_to_string(dir.path().join("run-cancel/events.jsonl")).unwrap();
        assert!(events.lines().count() <= 2);
        assert_eq!(summary.results.len(), events.lines().count());
    }

    fn catalog_entry_json(path: &str, label: &str, nearest: &[&str]) -> Value {
        json!({
            "tag": "button", "role": "button", "primary_label": label,
            "dom_path": path, "robust_selectors": [format!("css={path}")],
            "nearest_texts": nearest, "bbox": [0.0, 0.0, 60.0, 20.0],
            "visible": true, "disabled": false,
        })
    }

    /// Stale-catalog scenario: the plan references index 5 against v1, the
    /// live page is v2 with the same element at index 1.
    #[tokio::test]
    async fn stale_index_rebinds_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakePageDriver::new());

        // First collection: six entries, the target last.
        fake.set_eval_handler(|script| {
            if script.contains("INTERACTIVE_TAGS") {
                let mut entries: Vec<Value> = (0..5)
                    .map(|i| {
                        catalog_entry_json(
                            &format!("body > a:nth-of-type({})", i + 1),
                            &format!("link{i}"),
                            &[],
                        )
                    })
                    .collect();
                entries.push(catalog_entry_json(
                    "body > main:nth-of-type(1) > button:nth-of-type(1)",
                    "購入する",
                    &["価格"],
                ));
                return Some(Ok(json!({
                    "url": "https://shop.example/item", "title": "Item", "entries": entries,
                })));
            }
            quiet_page_handler(script).or(Some(Ok(json!(true))))
        });

        let executor = RunExecutor::new(
            fake.clone() as Arc<dyn PageDriver>,
            dir.path().to_path_buf(),
            Vec::new(),
        );
        let v1 = executor.refresh_catalog_now().await.unwrap().catalog_version;

        // Live page shrank: the buy button moved up to index 1.
        fake.set_eval_handler(|script| {
            if script.contains("INTERACTIVE_TAGS") {
                return Some(Ok(json!({
                    "url": "https://shop.example/item", "title": "Item", "entries": [
                        catalog_entry_json("body > a:nth-of-type(1)", "link0", &[]),
                        catalog_entry_json(
                            "body > main:nth-of-type(1) > button:nth-of-type(1)",
                            "購入する",
                            &["価格"],
                        ),
                    ],
                })));
            }
            if script.contains("wantedOrdinal = 1") {
                return Some(Ok(json!({
                    "candidates": [candidate(
                        "body > main:nth-of-type(1) > button:nth-of-type(1)", "購入する", 1)],
                    "anchor": null,
                })));
            }
            if script.contains("getComputedStyle") {
                return Some(Ok(json!("visible")));
            }
            if script.contains("disabled !== true") {
                return Some(Ok(json!(true)));
            }
            quiet_page_handler(script).or(Some(Ok(json!(true))))
        });

        let payload = json!({
            "run_id": "run-rebind",
            "metadata": {"expected_catalog_version": v1},
            "actions": [
                {"type": "click", "selector": {"index": 5}},
                {"type": "wait", "for": {"timeout_ms": 10}, "timeout_ms": 10},
            ],
        });
        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(summary.success, "summary error: {:?}", summary.error);
        assert!(
            summary
                .warnings
                .iter()
                .any(|warning| warning.contains("Catalog index 5 rebound to 1")),
            "warnings: {:?}",
            summary.warnings
        );
    }

    #[tokio::test]
    async fn unconfident_rebind_fails_with_catalog_outdated() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            if script.contains("INTERACTIVE_TAGS") {
                return Some(Ok(json!({
                    "url": "https://shop.example/item", "title": "Item", "entries": [
                        catalog_entry_json("body > a:nth-of-type(1)", "link0", &[]),
                    ],
                })));
            }
            quiet_page_handler(script).or(Some(Ok(json!(true))))
        });
        let executor = executor_on(fake, &dir);
        executor.refresh_catalog_now().await.unwrap();

        let payload = json!({
            "run_id": "run-outdated",
            "metadata": {"expected_catalog_version": "v-long-gone"},
            "actions": [{"type": "click", "selector": {"index": 0}}],
        });
        let summary = executor.run(&payload, &CancellationToken::new()).await;
        assert!(!summary.success);
        assert_eq!(
            summary.results[0].error_code.as_deref(),
            Some("CATALOG_OUTDATED")
        );
    }

    #[tokio::test]
    async fn implicit_wait_is_inserted_after_index_click() {
        let config = RunConfig::default();
        let plan = vec![
            Action::Click {
                selector: Selector::ordinal(5),
                button: action_dsl::MouseButton::Left,
                click_count: 1,
                delay_ms: None,
            },
            Action::EvalJs {
                script: "1".into(),
            },
        ];
        let (augmented, notes) = augment_plan(plan, &config);
        assert_eq!(augmented.len(), 3);
        assert!(matches!(
            &augmented[1],
            Action::Wait {
                condition: Some(WaitCondition::ForSelector { .. }),
                ..
            }
        ));
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("index 5"));
    }

    #[tokio::test]
    async fn explicit_wait_suppresses_augmentation() {
        let config = RunConfig::default();
        let plan = vec![
            Action::Click {
                selector: Selector::ordinal(2),
                button: action_dsl::MouseButton::Left,
                click_count: 1,
                delay_ms: None,
            },
            Action::Wait {
                condition: None,
                timeout_ms: 500,
            },
        ];
        let (augmented, notes) = augment_plan(plan, &config);
        assert_eq!(augmented.len(), 2);
        assert!(notes.is_empty());
    }
}
