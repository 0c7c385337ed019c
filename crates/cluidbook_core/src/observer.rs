//! External observer update path.
//!
//! # Responsibility
//! - Classify observed application exchanges into record updates.
//! - Apply an update to the record named by an explicit `ActiveTarget`.
//!
//! # Invariants
//! - Only the observer writes `derived_state` / `derived_step`.
//! - The target id is passed in, never read from ambient state inside the
//!   update; callers load it with `ActiveTarget::load` right before applying.
//! - Exchanges started by the tool itself and non-2xx completions are ignored.

use crate::model::record::Record;
use crate::repo::record_repo::{RecordStore, StoreResult};
use crate::store::KeyValueStore;
use log::{debug, info};
use serde_json::Value;

/// Path fragment shared by all observed application endpoints.
pub const APPLICATIONS_PATH_MARKER: &str = "/loans/my/applications";
const BASIC_DATA_SUFFIX: &str = "/basicdata";
const STEP_SUFFIX: &str = "/step";
const SELF_INITIATOR_PREFIX: &str = "chrome-extension://";

/// When the exchange was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    /// Outgoing request; the body is the request payload.
    Request,
    /// Completed response; the body is the response payload.
    Completed { status: u16 },
}

/// One request or response seen by the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedExchange {
    pub path: String,
    pub initiator: Option<String>,
    pub phase: ExchangePhase,
    pub body: Option<Value>,
}

/// Record change inferred from an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedUpdate {
    /// Applicant name reported by the basic data endpoint.
    Note(String),
    /// Application progress reported by the step endpoint.
    Step {
        application_state: Option<String>,
        step_code: String,
    },
}

impl ObservedUpdate {
    fn apply_to(&self, record: &mut Record) {
        match self {
            Self::Note(note) => record.note = note.clone(),
            Self::Step {
                application_state,
                step_code,
            } => {
                record.derived_state = application_state.clone();
                record.derived_step = Some(step_code.clone());
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Note(_) => "note",
            Self::Step { .. } => "step",
        }
    }
}

/// Record id that observer updates are routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveTarget {
    id: Option<String>,
}

impl ActiveTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Reads the last active pointer from the record store.
    pub async fn load<S: KeyValueStore>(store: &RecordStore<S>) -> StoreResult<Self> {
        Ok(Self {
            id: store.last_active().await?,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Classifies an exchange; `None` when it carries no record update.
pub fn classify_exchange(exchange: &ObservedExchange) -> Option<ObservedUpdate> {
    if exchange
        .initiator
        .as_deref()
        .is_some_and(|initiator| initiator.starts_with(SELF_INITIATOR_PREFIX))
    {
        return None;
    }
    if let ExchangePhase::Completed { status } = exchange.phase {
        if !(200..300).contains(&status) {
            return None;
        }
    }
    if !exchange.path.contains(APPLICATIONS_PATH_MARKER) {
        return None;
    }

    let body = exchange.body.as_ref()?;
    if exchange.path.ends_with(BASIC_DATA_SUFFIX) {
        return basic_data_note(body).map(ObservedUpdate::Note);
    }
    if exchange.path.ends_with(STEP_SUFFIX) {
        let step_code = body.get("step").and_then(|step| step.get("code"));
        return scalar_text(step_code).map(|step_code| ObservedUpdate::Step {
            application_state: scalar_text(body.get("applicationState")),
            step_code,
        });
    }
    None
}

/// Applies `update` to the active target's record, creating it when missing.
///
/// Returns `Ok(None)` when there is no active target.
pub async fn apply_observed_update<S: KeyValueStore>(
    store: &RecordStore<S>,
    target: &ActiveTarget,
    update: &ObservedUpdate,
) -> StoreResult<Option<Record>> {
    let Some(id) = target.id() else {
        debug!(
            "event=observer_update module=observer status=skipped reason=no_active_target kind={}",
            update.kind()
        );
        return Ok(None);
    };

    let mut record = store.get(id).await?.unwrap_or_else(|| Record::new(id));
    update.apply_to(&mut record);
    let stored = store.upsert(record).await?;

    info!(
        "event=observer_update module=observer status=ok id={} kind={}",
        stored.id,
        update.kind()
    );
    Ok(Some(stored))
}

fn basic_data_note(body: &Value) -> Option<String> {
    let first = scalar_text(body.get("firstname"))?;
    let last = scalar_text(body.get("lastname"))?;
    let note = format!("{first} {last}").trim().to_string();
    Some(note)
}

/// Non-empty string or number rendered as text.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
