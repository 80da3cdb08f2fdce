use std::os::raw::{c_char, c_void};
use std::sync::Once;

/// Swallows whisper.cpp's log output so stdout stays reserved for run progress.
unsafe extern "C" fn silent_log_callback(
    _level: u32,
    _c_msg: *const c_char,
    _user_data: *mut c_void,
) {
}

/// Install the silent callback exactly once per process.
pub fn init_whisper_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(silent_log_callback), std::ptr::null_mut());
    });
}
