//! Window manager errors
//!
//! Domain failures and the filter deciding which asynchronous protocol
//! errors can be ignored.

use thiserror::Error;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::xproto::{
    CONFIGURE_WINDOW_REQUEST, COPY_AREA_REQUEST, GRAB_BUTTON_REQUEST, GRAB_KEY_REQUEST,
    IMAGE_TEXT16_REQUEST, POLY_FILL_RECTANGLE_REQUEST, POLY_SEGMENT_REQUEST, POLY_TEXT8_REQUEST,
    SET_INPUT_FOCUS_REQUEST,
};

#[derive(Debug, Error)]
pub enum WmError {
    #[error("another window manager is already running")]
    AnotherWmRunning,

    #[error("fatal protocol error: request {request}, error {error}")]
    Protocol { request: u8, error: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no monitors available")]
    NoMonitors,
}

/// Whether an error caused by request `major_opcode` is expected while
/// windows come and go.
pub fn is_benign(major_opcode: u8, kind: ErrorKind) -> bool {
    if kind == ErrorKind::Window {
        return true;
    }
    matches!(
        (major_opcode, kind),
        (SET_INPUT_FOCUS_REQUEST, ErrorKind::Match)
            | (POLY_TEXT8_REQUEST, ErrorKind::Drawable)
            | (IMAGE_TEXT16_REQUEST, ErrorKind::Drawable)
            | (POLY_FILL_RECTANGLE_REQUEST, ErrorKind::Drawable)
            | (POLY_SEGMENT_REQUEST, ErrorKind::Drawable)
            | (CONFIGURE_WINDOW_REQUEST, ErrorKind::Match)
            | (GRAB_BUTTON_REQUEST, ErrorKind::Access)
            | (GRAB_KEY_REQUEST, ErrorKind::Access)
            | (COPY_AREA_REQUEST, ErrorKind::Drawable)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_window_always_benign() {
        assert!(is_benign(1, ErrorKind::Window));
        assert!(is_benign(CONFIGURE_WINDOW_REQUEST, ErrorKind::Window));
    }

    #[test]
    fn test_listed_pairs_benign() {
        assert!(is_benign(SET_INPUT_FOCUS_REQUEST, ErrorKind::Match));
        assert!(is_benign(GRAB_KEY_REQUEST, ErrorKind::Access));
        assert!(is_benign(COPY_AREA_REQUEST, ErrorKind::Drawable));
    }

    #[test]
    fn test_other_errors_fatal() {
        assert!(!is_benign(SET_INPUT_FOCUS_REQUEST, ErrorKind::Value));
        assert!(!is_benign(CONFIGURE_WINDOW_REQUEST, ErrorKind::Value));
        assert!(!is_benign(GRAB_KEY_REQUEST, ErrorKind::Match));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            WmError::AnotherWmRunning.to_string(),
            "another window manager is already running"
        );
        assert!(WmError::InvalidConfig("x".into()).to_string().contains("x"));
    }
}
