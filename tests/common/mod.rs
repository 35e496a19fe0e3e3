#![allow(dead_code)]

use oxidized_bench::audit::{AuditContext, AuditError, AuditOutput, Auditer};
use oxidized_bench::state::State;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Auditer that returns canned output and counts its invocations.
#[derive(Debug, Default)]
pub struct MockAuditer {
    pub output: AuditOutput,
    pub calls: AtomicUsize,
}

impl MockAuditer {
    pub fn returning(output: &str) -> Arc<Self> {
        Arc::new(MockAuditer {
            output: AuditOutput::ok(output),
            ..MockAuditer::default()
        })
    }

    pub fn deciding(state: State, error: &str) -> Arc<Self> {
        Arc::new(MockAuditer {
            output: AuditOutput::decided(state, "", error),
            ..MockAuditer::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Auditer for MockAuditer {
    fn execute(&self, _ctx: &AuditContext) -> AuditOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}

#[derive(serde::Deserialize)]
struct DecidedDescriptor {
    state: State,
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: String,
}

/// Constructor for a `mock` audit type. A string descriptor is echoed back;
/// a `{state, output, error}` mapping makes the auditer decide that state.
pub fn mock_from_descriptor(descriptor: &serde_yaml::Value) -> Result<Arc<dyn Auditer>, AuditError> {
    let invalid = |reason: String| AuditError::InvalidDescriptor {
        audit_type: "mock".to_string(),
        reason,
    };
    let auditer: Arc<dyn Auditer> = match descriptor {
        serde_yaml::Value::String(s) => MockAuditer::returning(s),
        serde_yaml::Value::Mapping(_) => {
            let decided: DecidedDescriptor = serde_yaml::from_value(descriptor.clone())
                .map_err(|e| invalid(e.to_string()))?;
            Arc::new(MockAuditer {
                output: AuditOutput::decided(decided.state, decided.output, decided.error),
                ..MockAuditer::default()
            })
        }
        _ => return Err(invalid("expected a string or a mapping".to_string())),
    };
    Ok(auditer)
}
