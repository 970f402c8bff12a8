use std::env;
use std::fmt::Display;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::warn;

/// Width used when none is given on the command line
const FALLBACK_WIDTH: u32 = 8;

/// Timeout used when none is given on the command line
const FALLBACK_TIMEOUT_MS: u64 = 30_000;

/// Parse the value of an environment variable, falling back to `default`
/// with a warning when the value is set but malformed
pub fn parse_setting<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        None => default,
        Some(val) => match val.trim().parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("ignoring {}={:?} ({}), using {}", key, val, err, default);
                default
            }
        },
    }
}

fn setting<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    parse_setting(key, env::var(key).ok(), default)
}

lazy_static! {
    pub static ref PARALLEL: bool = matches!(env::var("XFER_PARALLEL"), Ok(val) if val == "1");
    pub static ref DEFAULT_WIDTH: u32 = setting("XFER_WIDTH", FALLBACK_WIDTH);
    /// Zero disables the timeout
    pub static ref DEFAULT_TIMEOUT_MS: Option<u64> =
        match setting("XFER_TIMEOUT_MS", FALLBACK_TIMEOUT_MS) {
            0 => None,
            ms => Some(ms),
        };
}
