use crate::state::{ModemState, SessionKind};

fn initialized_state() -> ModemState {
    let mut state = ModemState::default();
    state.set_powered(true);
    state.set_initialized();
    state
}

#[test]
fn test_default_state() {
    let state = ModemState::default();

    assert!(!state.is_powered());
    assert!(!state.is_initialized());
    assert!(!state.is_registered());
    assert_eq!(SessionKind::None, state.session());
    assert!(!state.is_http_open());
    assert!(!state.is_stream_active());
}

#[test]
fn test_session_requires_initialized() {
    let mut state = ModemState::default();

    assert!(!state.set_session(SessionKind::BearerHttp));
    assert!(!state.is_registered());
}

#[test]
fn test_context_requires_session() {
    let mut state = initialized_state();

    assert!(!state.set_context_open());
    assert!(!state.is_http_open());
    assert!(!state.is_stream_active());
}

#[test]
fn test_context_follows_session_kind() {
    let mut state = initialized_state();

    assert!(state.set_session(SessionKind::BearerHttp));
    assert!(state.set_context_open());
    assert!(state.is_http_open());
    assert!(!state.is_stream_active());

    assert!(state.set_session(SessionKind::RawTcp));
    assert!(!state.is_http_open());
    assert!(!state.is_stream_active());

    assert!(state.set_context_open());
    assert!(state.is_stream_active());
}

#[test]
fn test_same_session_keeps_context() {
    let mut state = initialized_state();
    state.set_session(SessionKind::RawTcp);
    state.set_context_open();

    state.set_session(SessionKind::RawTcp);
    assert!(state.is_stream_active());
}

#[test]
fn test_clear_initialized_clears_dependents() {
    let mut state = initialized_state();
    state.set_session(SessionKind::BearerHttp);
    state.set_context_open();

    state.clear_initialized();

    assert!(state.is_powered());
    assert!(!state.is_initialized());
    assert!(!state.is_registered());
    assert!(!state.is_http_open());
}

#[test]
fn test_power_off_clears_everything() {
    let mut state = initialized_state();
    state.set_session(SessionKind::RawTcp);
    state.set_context_open();

    state.set_powered(false);
    assert_eq!(ModemState::default(), state);
}

#[test]
fn test_clear_context_keeps_session() {
    let mut state = initialized_state();
    state.set_session(SessionKind::BearerHttp);
    state.set_context_open();

    state.clear_context_open();
    assert!(state.is_registered());
    assert!(!state.is_http_open());
}
