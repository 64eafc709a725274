//! Periodic callbacks for countdown displays.
//!
//! [`Ticker`] hands out a [`Subscription`] per registration, so whoever owns
//! the handle decides how long the callback keeps firing. [`IntervalTicker`]
//! binds to `setInterval` in the browser; [`ManualTicker`] only fires when
//! told to.

#[cfg(test)]
#[path = "ticker_test.rs"]
mod ticker_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::warn;

use crate::feed::Subscription;

pub type TickHandler = Box<dyn FnMut()>;

/// A source of periodic ticks.
pub trait Ticker {
    /// Call `tick` every `period` until the returned handle is dropped.
    fn every(&self, period: Duration, tick: TickHandler) -> Subscription;
}

// =============================================================================
// BROWSER
// =============================================================================

/// `setInterval`-backed ticker.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalTicker;

#[cfg(target_arch = "wasm32")]
impl Ticker for IntervalTicker {
    fn every(&self, period: Duration, mut tick: TickHandler) -> Subscription {
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        let interval = gloo_timers::callback::Interval::new(millis, move || tick());
        Subscription::new(move || drop(interval))
    }
}

// =============================================================================
// MANUAL
// =============================================================================

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Rc<RefCell<TickHandler>>)>,
}

/// Ticker driven by [`ManualTicker::tick`]. Clones share registrations.
#[derive(Clone, Default)]
pub struct ManualTicker {
    registry: Rc<RefCell<Registry>>,
}

impl ManualTicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }

    /// Fire every live registration once.
    pub fn tick(&self) {
        let targets: Vec<Rc<RefCell<TickHandler>>> = self
            .registry
            .borrow()
            .handlers
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for target in targets {
            match target.try_borrow_mut() {
                Ok(mut tick) => (*tick)(),
                Err(_) => warn!("ticker: skipping re-entrant tick"),
            }
        }
    }
}

impl Ticker for ManualTicker {
    fn every(&self, _period: Duration, tick: TickHandler) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.handlers.push((id, Rc::new(RefCell::new(tick))));
            id
        };
        let registry: Weak<RefCell<Registry>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().handlers.retain(|(rid, _)| *rid != id);
            }
        })
    }
}
