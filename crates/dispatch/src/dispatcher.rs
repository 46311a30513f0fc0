//! Runs the advice selected by the first matching rule around a call.
//!
//! The dispatcher never alters an intercepted call's outcome because of a
//! handler: formatter and persister errors (and panics) are logged, counted
//! and swallowed. The call's own failure always passes through unchanged.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};

use traceable_core::{CallResult, CallSite, LogContent, LogKind};
use traceable_rules::{Entry, Rule, RuleStore};

use crate::around::{AroundAdvice, Proceed, TraceSink, TracingAround};
use crate::registry::HandlerRegistry;
use crate::traits::{Formatter, HandlerError, Persister};

pub struct Dispatcher {
    store: Arc<RuleStore>,
    formatters: Arc<HandlerRegistry<dyn Formatter>>,
    persisters: Arc<HandlerRegistry<dyn Persister>>,
    around: Arc<dyn AroundAdvice>,
    handler_failures: AtomicU64,
}

impl Dispatcher {
    /// Dispatcher reading rules from `store`, with [`TracingAround`] as the
    /// AROUND advice.
    pub fn new(
        store: Arc<RuleStore>,
        formatters: Arc<HandlerRegistry<dyn Formatter>>,
        persisters: Arc<HandlerRegistry<dyn Persister>>,
    ) -> Self {
        Self {
            store,
            formatters,
            persisters,
            around: Arc::new(TracingAround),
            handler_failures: AtomicU64::new(0),
        }
    }

    /// Replace the advice run for AROUND rules.
    pub fn with_around(mut self, around: Arc<dyn AroundAdvice>) -> Self {
        self.around = around;
        self
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn formatters(&self) -> &Arc<HandlerRegistry<dyn Formatter>> {
        &self.formatters
    }

    pub fn persisters(&self) -> &Arc<HandlerRegistry<dyn Persister>> {
        &self.persisters
    }

    /// Handler errors and panics caught since construction.
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    /// Run `proceed` for `site` under the advice of the first matching rule.
    ///
    /// `proceed` receives the arguments to call with: the site's own, or
    /// substitutes chosen by an AROUND advice. It runs at most once, and not
    /// at all when an AROUND advice declines to proceed.
    pub fn dispatch<F>(&self, site: CallSite, proceed: F) -> CallResult
    where
        F: FnOnce(&[Value]) -> CallResult,
    {
        let Some(rule) = self.store.match_first(&site) else {
            return proceed(&site.args);
        };
        trace!(call = %site.signature(), pattern = %rule.pattern, entry = %rule.entry, "rule matched");

        match rule.entry {
            Entry::Before => {
                self.emit(&rule, &LogContent::for_call(LogKind::TraceBefore, &site, None));
                proceed(&site.args)
            }
            Entry::After => {
                let outcome = proceed(&site.args);
                if outcome.is_ok() {
                    self.emit(
                        &rule,
                        &LogContent::for_call(LogKind::TraceAfter, &site, Some(&outcome)),
                    );
                }
                outcome
            }
            Entry::AfterThrowing => {
                let outcome = proceed(&site.args);
                if outcome.is_err() {
                    self.emit(
                        &rule,
                        &LogContent::for_call(LogKind::TraceAfterThrowing, &site, Some(&outcome)),
                    );
                }
                outcome
            }
            Entry::Around => {
                let capability = Proceed::new(&site.args, proceed);
                self.around
                    .around(&site, capability, TraceSink::new(self, &rule))
            }
        }
    }

    /// Render and persist one record with the rule's handlers.
    ///
    /// Both handlers are resolved before either runs, so an unknown identity
    /// skips the record entirely.
    pub(crate) fn emit(&self, rule: &Rule, content: &LogContent) {
        let handlers = self
            .formatters
            .get(rule.formatter.as_deref())
            .and_then(|formatter| Ok((formatter, self.persisters.get(rule.persister.as_deref())?)));
        let (formatter, persister) = match handlers {
            Ok(handlers) => handlers,
            Err(e) => {
                self.report(rule, &HandlerError::from(e));
                return;
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let text = formatter.render(content)?;
            persister.persist(&text)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.report(rule, &e),
            Err(payload) => self.report(rule, &HandlerError::Panicked(panic_message(&*payload))),
        }
    }

    fn report(&self, rule: &Rule, error: &HandlerError) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
        warn!(
            pattern = %rule.pattern,
            formatter = rule.formatter.as_deref().unwrap_or("(default)"),
            persister = rule.persister.as_deref().unwrap_or("(default)"),
            error = %error,
            "trace handler failed, record dropped"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
