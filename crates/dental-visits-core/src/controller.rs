//! Visit entry workflow.
//!
//! A host turns user actions into [`VisitCommand`]s and feeds them to a
//! [`VisitEntryController`]. The controller owns the open form, writes
//! through the store, and reports outcomes to a [`NotificationSink`].
//!
//! ```text
//! Open/Edit → SetField/Touch … → Submit ─┬─ invalid → error map (form stays open)
//!                                        ├─ store error → Error notification
//!                                        └─ saved → refresh_counter += 1, Success
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::models::{VisitInput, VisitPatch, VisitRecord, VisitStatus};
use crate::notify::{NotificationSink, Severity};
use crate::validation::{
    visit_record_rules, FormState, FormValues, ValidationErrors, NUMBER_MESSAGE,
};

/// One user action against the visit entry form or a stored visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum VisitCommand {
    /// Start a new record on `date`
    Open { date: NaiveDate },
    /// Load a stored record into the form
    Edit { id: i64 },
    SetField { field: String, value: String },
    Touch { field: String },
    Submit,
    ChangeStatus {
        id: i64,
        status: VisitStatus,
        reason: Option<String>,
    },
    Delete { id: i64 },
    Close,
}

/// What a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    FormOpened { editing: Option<i64> },
    FieldUpdated { field: String, error: Option<String> },
    Saved(VisitRecord),
    Invalid(ValidationErrors),
    StatusChanged(VisitRecord),
    Deleted { id: i64 },
    Closed,
    NoOpenForm,
    Failed(String),
}

impl CommandOutcome {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CommandOutcome::Saved(_) | CommandOutcome::StatusChanged(_) | CommandOutcome::Deleted { .. }
        )
    }
}

pub struct VisitEntryController<'a, S: NotificationSink> {
    db: &'a Database,
    sink: S,
    form: Option<FormState>,
    editing: Option<i64>,
    refresh_counter: u64,
}

impl<'a, S: NotificationSink> VisitEntryController<'a, S> {
    pub fn new(db: &'a Database, sink: S) -> Self {
        Self {
            db,
            sink,
            form: None,
            editing: None,
            refresh_counter: 0,
        }
    }

    /// Bumped after every successful write; hosts reload views when it moves.
    pub fn refresh_counter(&self) -> u64 {
        self.refresh_counter
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    /// Id of the stored record being edited, `None` for a new record.
    pub fn editing_id(&self) -> Option<i64> {
        self.editing
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn handle(&mut self, command: VisitCommand) -> CommandOutcome {
        tracing::debug!(?command, "visit command");

        match command {
            VisitCommand::Open { date } => self.open(date),
            VisitCommand::Edit { id } => self.edit(id),
            VisitCommand::SetField { field, value } => match self.form.as_mut() {
                Some(form) => {
                    form.set_value(&field, value);
                    let error = form.error(&field).map(str::to_string);
                    CommandOutcome::FieldUpdated { field, error }
                }
                None => CommandOutcome::NoOpenForm,
            },
            VisitCommand::Touch { field } => match self.form.as_mut() {
                Some(form) => {
                    form.set_field_touched(&field, true);
                    let error = form.error(&field).map(str::to_string);
                    CommandOutcome::FieldUpdated { field, error }
                }
                None => CommandOutcome::NoOpenForm,
            },
            VisitCommand::Submit => self.submit(),
            VisitCommand::ChangeStatus { id, status, reason } => {
                self.change_status(id, status, reason.as_deref())
            }
            VisitCommand::Delete { id } => self.delete(id),
            VisitCommand::Close => {
                self.form = None;
                self.editing = None;
                CommandOutcome::Closed
            }
        }
    }

    fn open(&mut self, date: NaiveDate) -> CommandOutcome {
        let mut values = FormValues::new();
        values.insert("visit_date".into(), date.to_string());
        values.insert("status".into(), VisitStatus::Scheduled.as_str().into());

        self.form = Some(FormState::new(values, visit_record_rules()));
        self.editing = None;
        CommandOutcome::FormOpened { editing: None }
    }

    fn edit(&mut self, id: i64) -> CommandOutcome {
        match self.db.get_visit(id) {
            Ok(Some(record)) => {
                self.form = Some(FormState::new(record_values(&record), visit_record_rules()));
                self.editing = Some(id);
                CommandOutcome::FormOpened { editing: Some(id) }
            }
            Ok(None) => self.fail(format!("Visit record {} not found", id)),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn submit(&mut self) -> CommandOutcome {
        let Some(form) = self.form.as_mut() else {
            return CommandOutcome::NoOpenForm;
        };

        let outcome = form.validate_all();
        if !outcome.is_valid {
            return CommandOutcome::Invalid(outcome.errors);
        }
        let input = match input_from_values(form.values()) {
            Ok(input) => input,
            Err(errors) => {
                form.merge_errors(errors.clone());
                return CommandOutcome::Invalid(errors);
            }
        };

        let result = match self.editing {
            Some(id) => self.db.update_visit(id, &patch_from_input(&input)),
            None => self.db.insert_visit(&input),
        };

        match result {
            Ok(record) => {
                self.form = None;
                self.editing = None;
                self.succeed("Visit record saved");
                CommandOutcome::Saved(record)
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn change_status(
        &mut self,
        id: i64,
        status: VisitStatus,
        reason: Option<&str>,
    ) -> CommandOutcome {
        match self.db.change_visit_status(id, status, reason) {
            Ok(record) => {
                self.succeed(&format!("Visit marked as {}", status));
                CommandOutcome::StatusChanged(record)
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn delete(&mut self, id: i64) -> CommandOutcome {
        match self.db.delete_visit(id) {
            Ok(true) => {
                if self.editing == Some(id) {
                    self.form = None;
                    self.editing = None;
                }
                self.succeed("Visit record deleted");
                CommandOutcome::Deleted { id }
            }
            Ok(false) => self.fail(format!("Visit record {} not found", id)),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn succeed(&mut self, message: &str) {
        self.refresh_counter += 1;
        self.sink.notify(message, Severity::Success);
    }

    fn fail(&self, message: String) -> CommandOutcome {
        self.sink.notify(&message, Severity::Error);
        CommandOutcome::Failed(message)
    }
}

/// Form values for a stored record.
pub fn record_values(record: &VisitRecord) -> FormValues {
    let optional = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut values = FormValues::new();
    values.insert("patient_id".into(), record.patient_id.to_string());
    values.insert("hygienist_id".into(), record.hygienist_id.to_string());
    values.insert("visit_date".into(), record.visit_date.to_string());
    values.insert("start_time".into(), optional(&record.start_time));
    values.insert("end_time".into(), optional(&record.end_time));
    values.insert("status".into(), record.status.as_str().into());
    values.insert("cancellation_reason".into(), optional(&record.cancellation_reason));
    values.insert("notes".into(), optional(&record.notes));
    values
}

/// Convert validated form values into a typed input. Anything that still
/// fails to parse is reported against its field.
pub fn input_from_values(values: &FormValues) -> Result<VisitInput, ValidationErrors> {
    let get = |field: &str| values.get(field).map(|v| v.trim()).unwrap_or("");
    let optional = |field: &str| Some(get(field)).filter(|v| !v.is_empty()).map(str::to_string);

    let mut errors = ValidationErrors::new();
    let mut id = |field: &str| match get(field).parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            errors.insert(field.to_string(), NUMBER_MESSAGE.to_string());
            0
        }
    };
    let patient_id = id("patient_id");
    let hygienist_id = id("hygienist_id");

    let visit_date = NaiveDate::parse_from_str(get("visit_date"), "%Y-%m-%d");
    let status = get("status").parse::<VisitStatus>();

    match (visit_date, status) {
        (Ok(visit_date), Ok(status)) if errors.is_empty() => Ok(VisitInput {
            patient_id,
            hygienist_id,
            visit_date,
            start_time: optional("start_time"),
            end_time: optional("end_time"),
            status,
            cancellation_reason: optional("cancellation_reason"),
            notes: optional("notes"),
        }),
        (visit_date, status) => {
            if let Err(e) = visit_date {
                errors.insert("visit_date".to_string(), e.to_string());
            }
            if let Err(e) = status {
                errors.insert("status".to_string(), e.to_string());
            }
            Err(errors)
        }
    }
}

fn patch_from_input(input: &VisitInput) -> VisitPatch {
    VisitPatch {
        patient_id: Some(input.patient_id),
        hygienist_id: Some(input.hygienist_id),
        visit_date: Some(input.visit_date),
        start_time: Some(input.start_time.clone()),
        end_time: Some(input.end_time.clone()),
        status: Some(input.status),
        cancellation_reason: Some(input.cancellation_reason.clone()),
        notes: Some(input.notes.clone()),
    }
}
