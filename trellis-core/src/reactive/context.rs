//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently running, so
//! that tracked reads can be attributed to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running a subscriber pushes it; the guard
//! returned by [`ReactiveContext::enter`] pops it again, even on unwind. A
//! subscriber running inside another therefore hands the slot back to the
//! outer one when it finishes.
//!
//! [`ReactiveContext::untracked`] pushes an empty entry, which hides any
//! outer subscriber for the duration of the closure.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Make `subscriber` the active subscriber until the guard is dropped.
    pub fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.subscriber_id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { subscriber_id }
    }

    /// Run `f` with tracking paused.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        let _guard = Self { subscriber_id: None };
        f()
    }

    /// Check if reads are currently being attributed to a subscriber.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The active subscriber, if any.
    pub fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|s| s.subscriber_id()))
        })
    }

    /// Number of nested contexts, including untracked sections.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        // Verify we're popping the right context.
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.as_ref().map(|s| s.subscriber_id()),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }
    }
}
