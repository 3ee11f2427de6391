//! Rule-activation notifications.
//!
//! The evaluator reports every rule whose activation is positive to an
//! optional [`RuleSink`]. Sinks are passed explicitly; there is no global
//! event bus. [`RuleBroadcast`] fans one evaluation out to any number of
//! subscribers.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// One rule firing: the rule's index in configuration order and its
/// activation in (0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleFired {
    pub rule: usize,
    pub activation: f64,
}

/// Receiver of rule-activation events.
///
/// `begin_cycle` is called once at the start of every evaluation, before any
/// `rule_fired` of that cycle. Events within a cycle arrive in rule order.
pub trait RuleSink {
    fn begin_cycle(&mut self) {}

    fn rule_fired(&mut self, event: RuleFired);
}

impl<S: RuleSink + ?Sized> RuleSink for &mut S {
    fn begin_cycle(&mut self) {
        (**self).begin_cycle();
    }

    fn rule_fired(&mut self, event: RuleFired) {
        (**self).rule_fired(event);
    }
}

impl<S: RuleSink + ?Sized> RuleSink for Box<S> {
    fn begin_cycle(&mut self) {
        (**self).begin_cycle();
    }

    fn rule_fired(&mut self, event: RuleFired) {
        (**self).rule_fired(event);
    }
}

/// Shared sink: lets a subscriber be read back while the broadcast owns a
/// handle to it. A poisoned lock drops the event.
impl<S: RuleSink> RuleSink for Arc<Mutex<S>> {
    fn begin_cycle(&mut self) {
        if let Ok(mut sink) = self.lock() {
            sink.begin_cycle();
        }
    }

    fn rule_fired(&mut self, event: RuleFired) {
        if let Ok(mut sink) = self.lock() {
            sink.rule_fired(event);
        }
    }
}

/// Queue-backed sink. A disconnected receiver is ignored.
impl RuleSink for Sender<RuleFired> {
    fn rule_fired(&mut self, event: RuleFired) {
        let _ = self.send(event);
    }
}

/// Collects every event it receives, across cycles.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<RuleFired>,
    pub cycles: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleSink for RecordingSink {
    fn begin_cycle(&mut self) {
        self.cycles += 1;
    }

    fn rule_fired(&mut self, event: RuleFired) {
        self.events.push(event);
    }
}

/// Handle returned by [`RuleBroadcast::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Fan-out to independent subscribers. Every subscriber sees every event;
/// subscribers are notified in registration order.
#[derive(Default)]
pub struct RuleBroadcast<'a> {
    subscribers: Vec<(SubscriberId, Box<dyn RuleSink + Send + 'a>)>,
    next_id: u64,
}

impl<'a> RuleBroadcast<'a> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, sink: impl RuleSink + Send + 'a) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(sink)));
        id
    }

    /// Remove a subscriber. Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl RuleSink for RuleBroadcast<'_> {
    fn begin_cycle(&mut self) {
        for (_, sink) in &mut self.subscribers {
            sink.begin_cycle();
        }
    }

    fn rule_fired(&mut self, event: RuleFired) {
        for (_, sink) in &mut self.subscribers {
            sink.rule_fired(event);
        }
    }
}
