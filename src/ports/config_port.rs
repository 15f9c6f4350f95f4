//! Configuration access port.
//!
//! Lookups never fail: a missing or unparsable value yields `None` or the
//! caller's default. Validation reports malformed values separately.

pub trait ConfigPort {
    fn has_section(&self, section: &str) -> bool;
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    /// Accepts `true/yes/1` and `false/no/0`, case-insensitive.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
