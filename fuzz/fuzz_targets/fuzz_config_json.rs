//! Fuzz target: `LockerConfig::from_json`
//!
//! Any config the loader accepts must also pass validation on its own and
//! yield a non-zero open window.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartlocker::config::LockerConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = LockerConfig::from_json(json) {
        assert!(config.validate().is_ok());
        assert!(config.open_window_polls() >= 1);
    }
});
