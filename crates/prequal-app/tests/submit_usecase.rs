mod support;

use prequal_app::{App, JsonFileSink, Session, SubmitOutcome};
use prequal_core::registry::StepRegistry;

use support::{ENV_LOCK, RecordingSink, SHORT_REGISTRY, write_registry};

fn filled_session() -> Session {
    let mut session = Session::new(StepRegistry::builtin().expect("builtin registry"));
    session.go_to_step("step-employment-structure");
    session
        .choose("employment-structure", "Practice owner")
        .expect("structure");
    session.input("email", "dr@example.com").expect("email");
    session.input("phone-input", "5551234567").expect("phone");
    session.set_consent("consent", true).expect("consent");
    session
}

#[test]
fn submit_with_empty_email_is_blocked_and_changes_nothing() {
    let sink = RecordingSink::new();
    let app = App::new(&sink);

    let mut session = Session::new(StepRegistry::builtin().expect("builtin registry"));
    session.go_to_step("step-contact");
    session.input("phone-input", "5551234567").expect("phone");

    let view_before = session.view();
    let record_before = session.record();
    let furthest_before = session.controller().furthest_index();

    let outcome = app.submit(&session).expect("submit");

    let SubmitOutcome::Blocked(missing) = outcome else {
        panic!("expected blocked submission");
    };
    assert_eq!(missing.fields, vec!["email"]);
    assert!(sink.submissions().is_empty());
    assert_eq!(session.view(), view_before);
    assert_eq!(session.record(), record_before);
    assert_eq!(session.controller().furthest_index(), furthest_before);
}

#[test]
fn submit_hands_full_record_to_sink() {
    let sink = RecordingSink::new();
    let app = App::new(&sink);
    let session = filled_session();

    let outcome = app.submit(&session).expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Submitted(prequal_app::SubmissionReceipt { path: None })
    );

    let submissions = sink.submissions();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.branch.as_deref(), Some("owner"));
    assert_eq!(submission.record.len(), 16);
    assert_eq!(
        submission.record.get("employment-structure"),
        Some(&serde_json::json!("Practice owner"))
    );
    assert_eq!(
        submission.record.get("email"),
        Some(&serde_json::json!("dr@example.com"))
    );
    assert!(submission.submitted_at.ends_with('Z'));
}

#[test]
fn sink_failure_is_reported_with_context() {
    let sink = RecordingSink::failing();
    let app = App::new(&sink);

    let error = app
        .submit(&filled_session())
        .expect_err("sink failure should propagate");
    assert!(error.to_string().contains("failed to hand off submission"));
    assert!(format!("{error:#}").contains("backend unavailable"));
}

#[test]
fn json_file_sink_receipt_points_at_written_file() {
    let temp = tempfile::tempdir().expect("temp dir");
    let sink = JsonFileSink::new(temp.path().join("submissions"));
    let app = App::new(&sink);

    let outcome = app.submit(&filled_session()).expect("submit");
    let SubmitOutcome::Submitted(receipt) = outcome else {
        panic!("expected submitted outcome");
    };
    let path = receipt.path.expect("written path");
    assert!(path.starts_with(temp.path().join("submissions")));
    assert!(path.is_file());
}

#[test]
fn session_uses_registry_from_home_config() {
    let _guard = ENV_LOCK.lock().expect("env lock");

    let temp = tempfile::tempdir().expect("temp dir");
    write_registry(temp.path(), SHORT_REGISTRY);
    unsafe {
        std::env::set_var("HOME", temp.path());
    }

    let sink = RecordingSink::new();
    let app = App::new(&sink);
    let session = app
        .start_session(&[("name".to_string(), "Dana Reyes".to_string())])
        .expect("session");

    assert_eq!(session.registry().steps().len(), 2);
    assert_eq!(
        session.record().get("full-name"),
        Some(&serde_json::json!("Dana Reyes"))
    );
}

#[test]
fn invalid_home_registry_reports_doctor_hint() {
    let _guard = ENV_LOCK.lock().expect("env lock");

    let temp = tempfile::tempdir().expect("temp dir");
    write_registry(temp.path(), "version = 1\nsteps = []\n");
    unsafe {
        std::env::set_var("HOME", temp.path());
    }

    let sink = RecordingSink::new();
    let app = App::new(&sink);
    let error = app.start_session(&[]).expect_err("invalid registry");

    let message = error.to_string();
    assert!(message.contains("invalid registry"));
    assert!(message.contains("prequal doctor"));
}

#[test]
fn init_registry_refuses_to_overwrite_without_force() {
    let _guard = ENV_LOCK.lock().expect("env lock");

    let temp = tempfile::tempdir().expect("temp dir");
    unsafe {
        std::env::set_var("HOME", temp.path());
    }

    let sink = RecordingSink::new();
    let app = App::new(&sink);
    let path = app.init_registry(false).expect("first init");
    assert_eq!(
        path,
        temp.path().join(".config").join("prequal").join("wizard.toml")
    );

    let error = app.init_registry(false).expect_err("second init");
    assert!(error.to_string().contains("already exists"));
    assert!(app.init_registry(true).is_ok());
}
