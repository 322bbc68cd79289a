//! Wall-clock port trait. Only the trade gateway reads time; replay never does.

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}
