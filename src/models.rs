use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::scope::PrincipalKind;

// --- Tenants & Form Metadata (Mapped to Database) ---

/// Agency
///
/// A tenant organisation. Everything except platform admins hangs off an agency.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Agency {
    pub id: i64,
    pub name: String,
    // Inactive agencies keep their data but are hidden from field agents' form lists.
    pub status: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Project
///
/// A configurable survey/report form owned by an agency.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Project {
    pub id: i64,
    pub agency_id: i64,
    pub name: String,
    pub client: String,
    pub rank: i32,
    // Only active projects accept submissions and are shipped to field agents.
    pub status: bool,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    // Submissions must carry coordinates.
    pub location_status: bool,
    // Submissions must carry an uploaded photo key.
    pub image_required: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FormSection
///
/// A titled group of fields within a project's form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct FormSection {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub rank: i32,
}

/// ProjectField
///
/// A form-field definition (the legacy "ProjectAssoc" row). `column_name` is the key
/// under which answers are submitted and is unique within a project.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct ProjectField {
    pub id: i64,
    pub project_id: i64,
    pub section_id: i64,
    pub column_name: String,
    pub display_name: String,
    pub field_type: String,
    pub rank: i32,
    pub multiple: bool,
    pub required: bool,
}

/// InputOption
///
/// One selectable choice of a `select` field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct InputOption {
    pub id: i64,
    pub field_id: i64,
    pub title: String,
    pub rank: i32,
}

// --- Principals ---

/// User
///
/// An agency office user. The password hash is loaded for login checks but never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub agency_id: Option<i64>,
    pub name: String,
    pub username: String,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub region: String,
    pub active: bool,
}

/// Ba
///
/// A field agent. Sees only the projects it is assigned to through `BaProject` rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Ba {
    pub id: i64,
    pub agency_id: Option<i64>,
    pub name: String,
    pub phone: String,
    pub username: String,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub active: bool,
}

/// BaProject
///
/// Assignment of a field agent to a project.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct BaProject {
    pub id: i64,
    pub ba_id: i64,
    pub project_id: i64,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
}

/// UAdmin
///
/// A platform administrator. Superusers see every agency; others see the agencies
/// linked through `UAdminAgency`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct UAdmin {
    pub id: i64,
    pub name: String,
    pub username: String,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct UAdminAgency {
    pub id: i64,
    pub admin_id: i64,
    pub agency_id: i64,
}

// --- Submitted Data ---

/// FieldValue
///
/// A typed answer, stored as JSONB. Serialized adjacently tagged:
/// `{"type": "number", "value": 4.5}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
    Boolean(bool),
    Choice(Vec<String>),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// Flat string rendering used by the project data view.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Choice(choices) => choices.join(", "),
        }
    }

    /// Untagged JSON rendering used by the wide records view.
    pub fn to_plain_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::from(s.as_str()),
            FieldValue::Number(n) => serde_json::Value::from(*n),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Date(d) => serde_json::Value::from(d.format("%Y-%m-%d").to_string()),
            FieldValue::Boolean(b) => serde_json::Value::from(*b),
            FieldValue::Choice(choices) => serde_json::Value::from(choices.clone()),
        }
    }
}

/// Submission
///
/// One typed value of one field from one form fill. Rows of the same fill share a
/// `submission_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Submission {
    pub id: i64,
    pub submission_id: Uuid,
    pub project_id: i64,
    pub field_id: i64,
    pub ba_id: Option<i64>,
    pub user_id: Option<i64>,
    #[ts(as = "FieldValue")]
    #[schema(value_type = FieldValue)]
    pub value: Json<FieldValue>,
    #[ts(type = "string")]
    pub t_date: NaiveDate,
    #[ts(type = "string")]
    pub submitted_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_key: Option<String>,
    // Loaded via a JOIN on project_fields by the data views.
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub column_name: Option<String>,
}

/// A validated value ready to be written, produced by the form pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSubmissionValue {
    pub submission_id: Uuid,
    pub project_id: i64,
    pub field_id: i64,
    pub ba_id: Option<i64>,
    pub user_id: Option<i64>,
    pub value: FieldValue,
    pub t_date: NaiveDate,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_key: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAgencyRequest {
    pub name: String,
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAgencyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProjectRequest {
    pub agency_id: i64,
    pub name: String,
    pub client: Option<String>,
    pub rank: Option<i32>,
    pub status: Option<bool>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub location_status: Option<bool>,
    pub image_required: Option<bool>,
}

/// UpdateProjectRequest
///
/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateFormSectionRequest {
    pub project_id: i64,
    pub title: String,
    pub rank: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateFormSectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProjectFieldRequest {
    pub project_id: i64,
    pub section_id: i64,
    pub column_name: String,
    pub display_name: String,
    pub field_type: Option<String>,
    pub rank: Option<i32>,
    pub multiple: Option<bool>,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProjectFieldRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateInputOptionRequest {
    pub field_id: i64,
    pub title: String,
    pub rank: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateInputOptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
}

/// CreateUserRequest
///
/// The plain-text password is hashed before it reaches the database and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub agency_id: Option<i64>,
    pub name: String,
    pub username: String,
    pub password: String,
    pub region: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBaRequest {
    pub agency_id: Option<i64>,
    pub name: String,
    pub phone: Option<String>,
    pub username: String,
    pub password: String,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBaRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBaProjectRequest {
    pub ba_id: i64,
    pub project_id: i64,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBaProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUAdminRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUAdminRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUAdminAgencyRequest {
    pub admin_id: i64,
    pub agency_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUAdminAgencyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<i64>,
}

/// Submissions are written through `/submit-form` only; stored values are immutable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoUpdate {}

/// SubmitFormRequest
///
/// One filled-in form. `answers` maps a field's `column_name` to the raw JSON answer,
/// which the form pipeline coerces to the field's declared type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitFormRequest {
    pub project_id: i64,
    #[ts(type = "string | null")]
    pub t_date: Option<NaiveDate>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_key: Option<String>,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub answers: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmissionReceipt {
    pub submission_id: Uuid,
    pub project_id: i64,
    pub values: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Profile
///
/// The caller's identity and scope facts (GET /profile, login responses).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: i64,
    pub kind: PrincipalKind,
    pub name: String,
    pub username: String,
    pub agency_id: Option<i64>,
    pub agency_ids: Vec<i64>,
    pub project_ids: Vec<i64>,
    pub superuser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub kind: PrincipalKind,
    pub expires_in: u64,
    pub profile: Profile,
}

/// PresignedUrlRequest
///
/// Requests an upload slot for a submission photo of `project_id`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    pub project_id: i64,
    /// The original filename, used to derive the file extension.
    #[schema(example = "shelf_photo.jpg")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to send back as `image_key` on submission.
    pub resource_key: String,
}

/// DashboardStats
///
/// Row counts restricted to what the caller may see.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub agencies: i64,
    pub projects: i64,
    pub active_projects: i64,
    pub users: i64,
    pub bas: i64,
    pub submissions: i64,
}

/// WideRecord
///
/// One form fill pivoted into a single object keyed by column name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct WideRecord {
    pub submission_id: Uuid,
    pub project_id: i64,
    pub ba_id: Option<i64>,
    pub user_id: Option<i64>,
    #[ts(type = "string")]
    pub t_date: NaiveDate,
    #[ts(type = "string")]
    pub submitted_at: DateTime<Utc>,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub values: BTreeMap<String, serde_json::Value>,
}

// --- Query Parameters ---

/// Page
///
/// `?limit&offset` pagination shared by every collection endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 500;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AgencyFilter {
    pub status: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectFilter {
    pub agency_id: Option<i64>,
    pub status: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct FormSectionFilter {
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectFieldFilter {
    pub project_id: Option<i64>,
    pub section_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct InputOptionFilter {
    pub field_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserFilter {
    pub agency_id: Option<i64>,
    pub region: Option<String>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BaFilter {
    pub agency_id: Option<i64>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BaProjectFilter {
    pub ba_id: Option<i64>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UAdminFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UAdminAgencyFilter {
    pub admin_id: Option<i64>,
    pub agency_id: Option<i64>,
}

/// SubmissionFilter
///
/// Shared by the submissions collection and the data views. Dates bound `t_date`
/// inclusively.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SubmissionFilter {
    pub project_id: Option<i64>,
    pub ba_id: Option<i64>,
    pub user_id: Option<i64>,
    pub submission_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query parameters of GET /data/project-data/{project_id}.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectDataQuery {
    pub ba_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_data: Option<bool>,
}

/// Query parameters of GET /data/records.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RecordQuery {
    pub project_id: Option<i64>,
    pub ba_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    /// Comma-separated column names to keep in each record; all columns when absent.
    pub fields: Option<String>,
}

impl RecordQuery {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 1000;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// The requested column names, trimmed, without blanks.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Query parameters of GET /rich-data/ba/{ba_id}.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BaDataQuery {
    pub project_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_data: Option<bool>,
}

// --- Internal Rows ---

/// Login material of a principal. Never leaves the server.
#[derive(Debug, Clone, FromRow, Default)]
pub struct StoredCredentials {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub active: bool,
}
