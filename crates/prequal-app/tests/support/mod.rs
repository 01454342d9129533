use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::anyhow;
use prequal_app::{Submission, SubmissionReceipt, SubmissionSink};

pub static ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Default)]
pub struct RecordingSink {
    submissions: Mutex<Vec<Submission>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().expect("submissions lock").clone()
    }
}

impl SubmissionSink for RecordingSink {
    fn submit(&self, submission: &Submission) -> anyhow::Result<SubmissionReceipt> {
        if self.fail {
            return Err(anyhow!("backend unavailable"));
        }

        self.submissions
            .lock()
            .expect("submissions lock")
            .push(submission.clone());
        Ok(SubmissionReceipt { path: None })
    }
}

#[allow(dead_code)]
pub fn write_registry(home: &Path, contents: &str) {
    let config_dir = home.join(".config").join("prequal");
    fs::create_dir_all(&config_dir).expect("create config dir");
    fs::write(config_dir.join("wizard.toml"), contents).expect("write registry");
}

#[allow(dead_code)]
pub const SHORT_REGISTRY: &str = r#"
version = 1

[[sections]]
id = "about"
title = "About you"

[[steps]]
id = "step-name"
section = "about"
next = "step-email"

[[steps.fields]]
name = "full-name"
kind = "text"
param = "name"

[[steps]]
id = "step-email"
section = "about"
prev = "step-name"
next = "complete"

[[steps.fields]]
name = "email"
kind = "email"
required = true
"#;
