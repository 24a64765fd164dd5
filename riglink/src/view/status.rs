//! Status aggregation
//!
//! Reduces a full per-device status snapshot into the handful of
//! indicator lights an operator watches. `ready`, `win` and `fail`
//! are ORed across every device. `armed` only means something for the
//! device role it belongs to, so it is ORed only across devices whose
//! name matches the scope substring; an unrelated device raising its
//! own armed bit never lights the indicator.

use crate::feed::payload::StatusSnapshot;

/// Device-name substring selecting the devices whose `armed` flag
/// participates in the aggregate. Matched case-insensitively.
pub const DEFAULT_SCOPE_ROLE: &str = "simon";

/// The operator-facing reduction of the latest snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatedView {
    pub ready: bool,
    /// Armed, restricted to in-scope devices.
    pub armed: bool,
    pub win: bool,
    pub fail: bool,
}

/// Symbolic rendering class for one indicator light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStyle {
    Off,
    Ok,
    Warn,
    Bad,
}

impl AggregatedView {
    /// The four labeled indicator lights for this view.
    pub fn indicators(&self) -> [(&'static str, IndicatorStyle); 4] {
        fn dot(lit: bool, style: IndicatorStyle) -> IndicatorStyle {
            if lit {
                style
            } else {
                IndicatorStyle::Off
            }
        }
        [
            ("ready", dot(self.ready, IndicatorStyle::Ok)),
            ("armed", dot(self.armed, IndicatorStyle::Warn)),
            ("win", dot(self.win, IndicatorStyle::Ok)),
            ("fail", dot(self.fail, IndicatorStyle::Bad)),
        ]
    }
}

/// Holds the latest reduction. Every snapshot replaces the previous
/// view wholesale; nothing is carried over from snapshot to snapshot,
/// so a device dropping out of the snapshot drops out of the lights.
pub struct StatusAggregator {
    scope_role: String,
    view: AggregatedView,
}

impl StatusAggregator {
    pub fn new() -> StatusAggregator {
        StatusAggregator::with_scope_role(DEFAULT_SCOPE_ROLE)
    }

    pub fn with_scope_role(scope_role: &str) -> StatusAggregator {
        StatusAggregator {
            scope_role: scope_role.to_lowercase(),
            view: AggregatedView::default(),
        }
    }

    /// Recompute the view from scratch from `snapshot` and store it.
    /// The reduction is commutative, so map iteration order does not
    /// matter.
    pub fn apply(&mut self, snapshot: &StatusSnapshot) -> AggregatedView {
        let mut view = AggregatedView::default();
        for (name, device) in snapshot {
            view.ready |= device.ready;
            view.win |= device.win;
            view.fail |= device.fail;
            if name.to_lowercase().contains(&self.scope_role) {
                view.armed |= device.armed;
            }
        }
        self.view = view;
        view
    }

    /// The view computed from the most recent snapshot.
    pub fn view(&self) -> AggregatedView {
        self.view
    }

    pub fn scope_role(&self) -> &str {
        &self.scope_role
    }
}

impl Default for StatusAggregator {
    fn default() -> StatusAggregator {
        StatusAggregator::new()
    }
}
