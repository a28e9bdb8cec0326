use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing the current time across application. Allows
/// `today`, `yesterday` and report timestamps to be pinned in tests.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[derive(Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }
}
