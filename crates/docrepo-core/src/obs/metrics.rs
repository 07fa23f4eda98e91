use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static STATE: Mutex<EventState> = Mutex::new(EventState::new());

///
/// EventState
/// Process-wide counters, keyed per entity path.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) entities: BTreeMap<String, EntityCounters>,
}

impl EventState {
    const fn new() -> Self {
        Self {
            ops: EventOps::new(),
            entities: BTreeMap::new(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Execution entrypoints
    pub load_calls: u64,
    pub count_calls: u64,
    pub exists_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,

    // Documents touched
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,

    // Store traffic
    pub feed_pages: u64,
    pub storage_errors: u64,
    pub unsupported_rejections: u64,

    pub exec_micros_total: u64,
    pub exec_micros_max: u64,
}

impl EventOps {
    const fn new() -> Self {
        Self {
            load_calls: 0,
            count_calls: 0,
            exists_calls: 0,
            save_calls: 0,
            delete_calls: 0,
            rows_loaded: 0,
            rows_saved: 0,
            rows_deleted: 0,
            feed_pages: 0,
            storage_errors: 0,
            unsupported_rejections: 0,
            exec_micros_total: 0,
            exec_micros_max: 0,
        }
    }
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub load_calls: u64,
    pub count_calls: u64,
    pub exists_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,
    pub feed_pages: u64,
    pub storage_errors: u64,
}

///
/// EventReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut STATE.lock())
}

pub(crate) fn report() -> EventReport {
    let state = STATE.lock();

    EventReport {
        ops: state.ops.clone(),
        entities: state.entities.clone(),
    }
}

pub(crate) fn reset_all() {
    *STATE.lock() = EventState::new();
}

pub(crate) fn add_elapsed(total: &mut u64, max: &mut u64, micros: u64) {
    *total = total.saturating_add(micros);
    if micros > *max {
        *max = micros;
    }
}
