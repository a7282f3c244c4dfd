//! Dynamic form pipeline.
//!
//! Form metadata rows (sections, fields, options) are assembled into a
//! [`FormDefinition`], rendered in the mobile client's wire shape, and used to validate
//! and coerce submitted answers into typed [`FieldValue`]s.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    FieldValue, FormSection, InputOption, NewSubmissionValue, Project, ProjectField,
    SubmitFormRequest, Submission, WideRecord,
};

/// The declared type of a form field. `text` is accepted as an alias of `input`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Input,
    Number,
    Integer,
    Date,
    Boolean,
    Select,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Input => "input",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Select => "select",
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "input" | "text" => Ok(FieldType::Input),
            "number" => Ok(FieldType::Number),
            "integer" => Ok(FieldType::Integer),
            "date" => Ok(FieldType::Date),
            "boolean" => Ok(FieldType::Boolean),
            "select" => Ok(FieldType::Select),
            other => Err(format!(
                "unknown field_type '{other}' (expected input, text, number, integer, date, boolean or select)"
            )),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Assembly ---

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub field: ProjectField,
    pub field_type: FieldType,
    pub options: Vec<InputOption>,
    /// Rendered submitted values, present only when the data view asked for them.
    pub data_values: Option<Vec<String>>,
}

impl FieldDefinition {
    fn accepts_option(&self, title: &str) -> bool {
        self.options.iter().any(|o| o.title == title)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDefinition {
    pub section: FormSection,
    pub fields: Vec<FieldDefinition>,
}

/// FormDefinition
///
/// A project's complete form: sections ordered by `(rank, id)`, each holding its own
/// fields in the same order, each field holding its options in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinition {
    pub project: Project,
    pub agency_name: String,
    pub sections: Vec<SectionDefinition>,
}

impl FormDefinition {
    /// assemble
    ///
    /// Builds the tree from flat metadata rows in any order. Fields whose section is
    /// not part of `sections`, and options whose field is missing, are dropped.
    pub fn assemble(
        project: Project,
        agency_name: String,
        mut sections: Vec<FormSection>,
        mut fields: Vec<ProjectField>,
        mut options: Vec<InputOption>,
    ) -> Self {
        sections.sort_by_key(|s| (s.rank, s.id));
        fields.sort_by_key(|f| (f.rank, f.id));
        options.sort_by_key(|o| (o.rank, o.id));

        let mut options_by_field: BTreeMap<i64, Vec<InputOption>> = BTreeMap::new();
        for option in options {
            options_by_field.entry(option.field_id).or_default().push(option);
        }

        let mut fields_by_section: BTreeMap<i64, Vec<FieldDefinition>> = BTreeMap::new();
        for field in fields {
            let field_type = FieldType::from_str(&field.field_type).unwrap_or_else(|_| {
                tracing::warn!(
                    field_id = field.id,
                    field_type = %field.field_type,
                    "unknown stored field type, treating as input"
                );
                FieldType::Input
            });
            let options = options_by_field.remove(&field.id).unwrap_or_default();
            fields_by_section
                .entry(field.section_id)
                .or_default()
                .push(FieldDefinition {
                    field,
                    field_type,
                    options,
                    data_values: None,
                });
        }

        let sections = sections
            .into_iter()
            .map(|section| SectionDefinition {
                fields: fields_by_section.remove(&section.id).unwrap_or_default(),
                section,
            })
            .collect();

        Self {
            project,
            agency_name,
            sections,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field_by_column(&self, column_name: &str) -> Option<&FieldDefinition> {
        self.fields().find(|f| f.field.column_name == column_name)
    }

    /// Attaches the string rendering of `rows` to their fields, keeping the row order.
    /// Every field gets a (possibly empty) `data_values` list.
    pub fn attach_values(&mut self, rows: &[Submission]) {
        let mut by_field: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for row in rows {
            by_field.entry(row.field_id).or_default().push(row.value.0.render());
        }
        for section in &mut self.sections {
            for field in &mut section.fields {
                field.data_values = Some(by_field.remove(&field.field.id).unwrap_or_default());
            }
        }
    }
}

// --- Rendering ---
//
// The mobile client reads forms through duplicated positional keys, and every id and
// rank is a string.

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

fn date_or_empty(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

struct RenderedOption<'a>(&'a InputOption);

impl Serialize for RenderedOption<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rank = self.0.rank.to_string();
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("0", &self.0.title)?;
        map.serialize_entry("1", &rank)?;
        map.serialize_entry("option_text", &self.0.title)?;
        map.serialize_entry("option_rank", &rank)?;
        map.end()
    }
}

impl Serialize for FieldDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field = &self.field;
        let options: Vec<RenderedOption<'_>> = self.options.iter().map(RenderedOption).collect();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("input_title", &field.display_name)?;
        map.serialize_entry("field_id", &field.column_name)?;
        map.serialize_entry("input_rank", &field.rank.to_string())?;
        map.serialize_entry("field_type", self.field_type.as_str())?;
        map.serialize_entry("multiple_choice", &field.multiple.to_string())?;
        map.serialize_entry("options_available", yes_no(!self.options.is_empty()))?;
        map.serialize_entry("required", &field.required)?;
        map.serialize_entry("field_input_options", &options)?;
        if let Some(values) = &self.data_values {
            map.serialize_entry("data_values", values)?;
        }
        map.end()
    }
}

struct RenderedSection<'a> {
    section: &'a SectionDefinition,
    project: &'a Project,
}

impl Serialize for RenderedSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let section = &self.section.section;
        let id = section.id.to_string();
        let rank = section.rank.to_string();
        let location = on_off(self.project.location_status);
        let image = yes_no(self.project.image_required);

        let mut map = serializer.serialize_map(Some(11))?;
        map.serialize_entry("0", &section.title)?;
        map.serialize_entry("1", &id)?;
        map.serialize_entry("2", &rank)?;
        map.serialize_entry("3", location)?;
        map.serialize_entry("4", image)?;
        map.serialize_entry("form_title", &section.title)?;
        map.serialize_entry("form_id", &id)?;
        map.serialize_entry("form_rank", &rank)?;
        map.serialize_entry("location_status", location)?;
        map.serialize_entry("image_required", image)?;
        map.serialize_entry("form_fields", &self.section.fields)?;
        map.end()
    }
}

struct RenderedSections<'a>(&'a FormDefinition);

impl Serialize for RenderedSections<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.sections.len()))?;
        for section in &self.0.sections {
            seq.serialize_element(&RenderedSection {
                section,
                project: &self.0.project,
            })?;
        }
        seq.end()
    }
}

impl FormDefinition {
    fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("project_title", &self.project.name)?;
        map.serialize_entry("code_name", &self.project.name)?;
        map.serialize_entry("project_id", &self.project.id.to_string())?;
        map.serialize_entry("company", &self.agency_name)?;
        map.serialize_entry("start_date", &date_or_empty(self.project.start_date))?;
        map.serialize_entry("end_date", &date_or_empty(self.project.end_date))?;
        map.serialize_entry("forms", &RenderedSections(self))
    }
}

impl Serialize for FormDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

/// ProjectForm
///
/// A single rendered form as a top-level response, led by `"response": "success"` like
/// every other payload of the mobile contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectForm(pub FormDefinition);

impl Serialize for ProjectForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry("response", "success")?;
        self.0.serialize_entries(&mut map)?;
        map.end()
    }
}

/// BaForms
///
/// The forms payload of one field agent: every assigned, active project rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct BaForms {
    pub ba_id: i64,
    pub name: String,
    pub company: String,
    pub projects: Vec<FormDefinition>,
}

impl Serialize for BaForms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("response", "success")?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("ba_id", &self.ba_id.to_string())?;
        map.serialize_entry("company", &self.company)?;
        map.serialize_entry("projects", &self.projects)?;
        map.end()
    }
}

// --- Submission parsing ---

/// One rejected input, keyed by the column name (or request field) it concerns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// FormError
///
/// Every problem found in a submission. Parsing never stops at the first issue.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FormError {
    pub issues: Vec<FieldIssue>,
}

impl FormError {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Who is submitting. Exactly one id is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Submitter {
    Ba(i64),
    User(i64),
}

/// parse_submission
///
/// Validates `request` against `form` and produces one value row per answered field,
/// all sharing a fresh `submission_id`. `today` is used when the request carries no
/// `t_date`.
pub fn parse_submission(
    form: &FormDefinition,
    request: &SubmitFormRequest,
    submitter: Submitter,
    today: NaiveDate,
) -> Result<Vec<NewSubmissionValue>, FormError> {
    let mut errors = FormError::default();
    let project = &form.project;

    if request.project_id != project.id {
        errors.push("project_id", "does not match the form");
    }
    if !project.status {
        errors.push("project_id", "project is not accepting submissions");
    }

    for column in request.answers.keys() {
        if form.field_by_column(column).is_none() {
            errors.push(column.as_str(), "unknown field");
        }
    }

    let image_key = request
        .image_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    if project.image_required && image_key.is_none() {
        errors.push("image_key", "an image is required for this project");
    }

    check_coordinate(
        &mut errors,
        "latitude",
        request.latitude,
        90.0,
        project.location_status,
    );
    check_coordinate(
        &mut errors,
        "longitude",
        request.longitude,
        180.0,
        project.location_status,
    );

    let mut typed = Vec::new();
    for field in form.fields() {
        let column = field.field.column_name.as_str();
        let raw = request.answers.get(column).filter(|v| !is_blank(v));
        match raw {
            None if field.field.required => errors.push(column, "is required"),
            None => {}
            Some(raw) => match coerce(field, raw) {
                Ok(value) => typed.push((field.field.id, value)),
                Err(message) => errors.push(column, message),
            },
        }
    }

    if typed.is_empty() && errors.issues.is_empty() {
        errors.push("answers", "submission contains no answers");
    }
    if !errors.issues.is_empty() {
        return Err(errors);
    }

    let submission_id = Uuid::new_v4();
    let (ba_id, user_id) = match submitter {
        Submitter::Ba(id) => (Some(id), None),
        Submitter::User(id) => (None, Some(id)),
    };
    let t_date = request.t_date.unwrap_or(today);

    Ok(typed
        .into_iter()
        .map(|(field_id, value)| NewSubmissionValue {
            submission_id,
            project_id: project.id,
            field_id,
            ba_id,
            user_id,
            value,
            t_date,
            latitude: request.latitude,
            longitude: request.longitude,
            image_key: image_key.clone(),
        })
        .collect())
}

fn check_coordinate(
    errors: &mut FormError,
    name: &str,
    value: Option<f64>,
    bound: f64,
    required: bool,
) {
    match value {
        None if required => errors.push(name, "location is required for this project"),
        None => {}
        Some(v) if !v.is_finite() || v.abs() > bound => {
            errors.push(name, format!("must be between -{bound} and {bound}"))
        }
        Some(_) => {}
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce(field: &FieldDefinition, raw: &Value) -> Result<FieldValue, String> {
    match field.field_type {
        FieldType::Input => scalar_text(raw)
            .map(FieldValue::Text)
            .ok_or_else(|| "expected text".to_string()),
        FieldType::Number => {
            let number = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(n) if n.is_finite() => Ok(FieldValue::Number(n)),
                _ => Err("expected a number".to_string()),
            }
        }
        FieldType::Integer => {
            let integer = match raw {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            integer
                .map(FieldValue::Integer)
                .ok_or_else(|| "expected a whole number".to_string())
        }
        FieldType::Date => match raw {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| "expected a date formatted YYYY-MM-DD".to_string()),
            _ => Err("expected a date formatted YYYY-MM-DD".to_string()),
        },
        FieldType::Boolean => {
            let flag = match raw {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => Some(true),
                    "false" | "no" | "0" | "off" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            flag.map(FieldValue::Boolean)
                .ok_or_else(|| "expected true or false".to_string())
        }
        FieldType::Select => {
            let choices: Vec<String> = match raw {
                Value::Array(items) => items
                    .iter()
                    .filter(|v| !is_blank(v))
                    .map(|v| scalar_text(v).ok_or_else(|| "expected option titles".to_string()))
                    .collect::<Result<_, _>>()?,
                other => {
                    vec![scalar_text(other).ok_or_else(|| "expected an option title".to_string())?]
                }
            };
            if choices.len() > 1 && !field.field.multiple {
                return Err("only one option may be selected".to_string());
            }
            if let Some(unknown) = choices.iter().find(|c| !field.accepts_option(c)) {
                return Err(format!("'{unknown}' is not one of the options"));
            }
            Ok(FieldValue::Choice(choices))
        }
    }
}

// --- Wide records ---

/// pivot_records
///
/// Groups value rows (already joined with their `column_name`) into one record per
/// `submission_id`, in order of first appearance.
pub fn pivot_records(rows: Vec<Submission>) -> Vec<WideRecord> {
    let mut records: Vec<WideRecord> = Vec::new();
    let mut index: BTreeMap<Uuid, usize> = BTreeMap::new();

    for row in rows {
        let position = *index.entry(row.submission_id).or_insert_with(|| {
            records.push(WideRecord {
                submission_id: row.submission_id,
                project_id: row.project_id,
                ba_id: row.ba_id,
                user_id: row.user_id,
                t_date: row.t_date,
                submitted_at: row.submitted_at,
                values: BTreeMap::new(),
            });
            records.len() - 1
        });
        let column = row
            .column_name
            .clone()
            .unwrap_or_else(|| format!("field_{}", row.field_id));
        records[position]
            .values
            .insert(column, row.value.0.to_plain_json());
    }
    records
}
