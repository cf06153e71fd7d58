use chrono::NaiveTime;

use crate::types::ShiftBlock;

pub const DEFAULT_SERVICE_MINUTES: f64 = 10.0;

pub const DEFAULT_ROUTING_TIMEOUT_SECONDS: u64 = 10;

pub fn default_work_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("valid static default work start")
}

pub fn default_work_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("valid static default work end")
}

/// Length of one continuous shift in minutes
pub fn default_shift_minutes() -> f64 {
    (default_work_end() - default_work_start()).num_minutes() as f64
}

/// Morning and afternoon block, each with a 30 minute break and a 5 minute
/// traffic allowance per hour of work
pub fn default_shift_blocks() -> Vec<ShiftBlock> {
    vec![ShiftBlock::new(240.0, 30.0, 5.0), ShiftBlock::new(240.0, 30.0, 5.0)]
}
