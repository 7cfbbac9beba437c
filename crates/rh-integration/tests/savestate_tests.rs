//! Savestate round trips and rejected restores

use rh_core::config::AudioBackendKind;
use rh_core::{Config, HostError, RestoreError};
use rh_input::{keycodes, KeyAction, MotionSource};
use rh_integration::{CreateParams, Runtime, Session, SessionState};
use std::fs;
use tempfile::TempDir;

fn setup(content: &[u8]) -> (TempDir, Session) {
    let dir = TempDir::new().unwrap();
    let core = dir.path().join("testpattern_libretro_android.so");
    let game = dir.path().join("game.tp");
    fs::write(&core, b"").unwrap();
    fs::write(&game, content).unwrap();
    fs::create_dir(dir.path().join("system")).unwrap();
    fs::create_dir(dir.path().join("saves")).unwrap();

    let mut config = Config::default();
    config.audio.backend = AudioBackendKind::Null;
    let mut session = Runtime::new(config).new_session();
    session
        .create(CreateParams::new(
            core,
            game,
            dir.path().join("system"),
            dir.path().join("saves"),
        ))
        .unwrap();
    session.resume().unwrap();
    (dir, session)
}

fn step(session: &mut Session, frames: usize) {
    for _ in 0..frames {
        session.step().unwrap();
    }
}

#[test]
fn test_restore_returns_to_saved_state() {
    let (_dir, mut session) = setup(b"hello world");

    step(&mut session, 60);
    let saved = session.serialize().unwrap();
    step(&mut session, 60);
    assert_ne!(session.serialize().unwrap(), saved);

    session.unserialize(&saved).unwrap();
    assert_eq!(session.serialize().unwrap(), saved);
}

#[test]
fn test_replay_after_restore_is_deterministic() {
    let (_dir, mut session) = setup(b"hello world");
    let input = session.input();

    step(&mut session, 30);
    let saved = session.serialize().unwrap();

    input.on_key_event(0, KeyAction::Press, keycodes::DPAD_RIGHT).unwrap();
    input
        .on_motion_event(2, MotionSource::AnalogLeft, 0.0, 1.0)
        .unwrap();
    step(&mut session, 40);
    let first_run = session.serialize().unwrap();

    session.unserialize(&saved).unwrap();
    step(&mut session, 40);
    assert_eq!(session.serialize().unwrap(), first_run);
}

#[test]
fn test_truncated_buffer_leaves_state_unchanged() {
    let (_dir, mut session) = setup(b"hello world");
    step(&mut session, 10);
    let saved = session.serialize().unwrap();
    step(&mut session, 10);
    let current = session.serialize().unwrap();

    let err = session.unserialize(&saved[..saved.len() - 1]).unwrap_err();
    assert!(matches!(
        err,
        HostError::Restore(RestoreError::Malformed { expected, actual })
            if expected == saved.len() && actual == saved.len() - 1
    ));
    assert!(session.unserialize(&[]).is_err());

    let mut padded = saved.clone();
    padded.push(0);
    assert!(session.unserialize(&padded).is_err());

    assert_eq!(session.serialize().unwrap(), current);
    assert_eq!(session.state(), SessionState::Running);
}

#[test]
fn test_foreign_state_rejected() {
    let (_dir_a, mut a) = setup(b"hello world");
    let (_dir_b, mut b) = setup(b"some other game");
    step(&mut a, 5);
    step(&mut b, 5);

    let foreign = b.serialize().unwrap();
    let before = a.serialize().unwrap();
    assert_eq!(foreign.len(), before.len());

    let err = a.unserialize(&foreign).unwrap_err();
    assert!(matches!(err, HostError::Restore(RestoreError::Incompatible(_))));
    assert_eq!(a.serialize().unwrap(), before);

    // Garbage of the right size is no better.
    let garbage = vec![0xFF; before.len()];
    assert!(a.unserialize(&garbage).is_err());
    assert_eq!(a.serialize().unwrap(), before);

    step(&mut a, 1);
    assert_eq!(a.frame_count(), 6);
}

#[test]
fn test_restore_while_paused() {
    let (_dir, mut session) = setup(b"hello world");
    let saved = session.serialize().unwrap();
    step(&mut session, 20);

    session.pause().unwrap();
    session.unserialize(&saved).unwrap();
    assert_eq!(session.state(), SessionState::Paused);
    assert_eq!(session.serialize().unwrap(), saved);
}
