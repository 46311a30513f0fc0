//! AROUND advice: the advice owns the decision to run the call.

use serde_json::Value;
use traceable_core::{CallResult, CallSite, LogContent, LogKind};
use traceable_rules::Rule;

use crate::dispatcher::Dispatcher;

/// Capability to run the intercepted call at most once.
///
/// Consumed by [`proceed`](Self::proceed) or [`proceed_with`](Self::proceed_with);
/// dropping it unused skips the call entirely.
pub struct Proceed<'a> {
    args: &'a [Value],
    call: Box<dyn FnOnce(&[Value]) -> CallResult + 'a>,
}

impl<'a> Proceed<'a> {
    pub(crate) fn new<F>(args: &'a [Value], call: F) -> Self
    where
        F: FnOnce(&[Value]) -> CallResult + 'a,
    {
        Self {
            args,
            call: Box::new(call),
        }
    }

    /// Arguments the call was intercepted with.
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Run the call with its original arguments.
    pub fn proceed(self) -> CallResult {
        (self.call)(self.args)
    }

    /// Run the call with substituted arguments.
    pub fn proceed_with(self, args: &[Value]) -> CallResult {
        (self.call)(args)
    }
}

/// Emits one record through the matched rule's formatter and persister.
///
/// Consumed on use, so an advice can log at most once per call.
pub struct TraceSink<'a> {
    dispatcher: &'a Dispatcher,
    rule: &'a Rule,
}

impl<'a> TraceSink<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, rule: &'a Rule) -> Self {
        Self { dispatcher, rule }
    }

    pub fn emit(self, content: &LogContent) {
        self.dispatcher.emit(self.rule, content);
    }
}

/// Advice run for rules whose entry is AROUND.
pub trait AroundAdvice: Send + Sync {
    /// Return value becomes the outcome of the intercepted call.
    fn around(&self, site: &CallSite, proceed: Proceed<'_>, sink: TraceSink<'_>) -> CallResult;
}

/// Proceeds with the original arguments and logs one record carrying the
/// arguments and the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAround;

impl AroundAdvice for TracingAround {
    fn around(&self, site: &CallSite, proceed: Proceed<'_>, sink: TraceSink<'_>) -> CallResult {
        let outcome = proceed.proceed();
        sink.emit(&LogContent::for_call(LogKind::TraceAround, site, Some(&outcome)));
        outcome
    }
}
