//! Per-entity SQL for the CRUD façade.
//!
//! Each row type implements [`Resource`], which tells the generic repository how to
//! insert, partially update and filter it. Access control is not done here; the
//! repository wraps every statement with the scope checks from [`crate::scope`].

use std::str::FromStr;

use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    Encode, FromRow, Postgres, QueryBuilder, Type,
    postgres::PgRow,
    query_builder::Separated,
};

use crate::{
    credentials::hash_password,
    forms::FieldType,
    models::{
        Agency, AgencyFilter, Ba, BaFilter, BaProject, BaProjectFilter, CreateAgencyRequest,
        CreateBaProjectRequest, CreateBaRequest, CreateFormSectionRequest,
        CreateInputOptionRequest, CreateProjectFieldRequest, CreateProjectRequest,
        CreateUAdminAgencyRequest, CreateUAdminRequest, CreateUserRequest, FormSection,
        FormSectionFilter, InputOption, InputOptionFilter, NoUpdate, Project, ProjectField,
        ProjectFieldFilter, ProjectFilter, Submission, SubmissionFilter, UAdmin, UAdminAgency,
        UAdminAgencyFilter, UAdminFilter, UpdateAgencyRequest, UpdateBaProjectRequest,
        UpdateBaRequest, UpdateFormSectionRequest, UpdateInputOptionRequest,
        UpdateProjectFieldRequest, UpdateProjectRequest, UpdateUAdminAgencyRequest,
        UpdateUAdminRequest, UpdateUserRequest, User, UserFilter,
    },
    scope::EntityKind,
};

/// Resource
///
/// A row type served by the generic CRUD endpoints. Statements are written against the
/// row alias `t`; `push_insert` receives a builder positioned after `INSERT INTO <table> `
/// and `push_update` one positioned after `UPDATE <table> t SET `.
pub trait Resource:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static
{
    const KIND: EntityKind;
    const ORDER_BY: &'static str = "t.id";
    /// Whether the generic create/update endpoints are offered.
    const MUTABLE: bool = true;

    type Create: DeserializeOwned + Send + Sync + 'static;
    type Update: DeserializeOwned + Send + Sync + 'static;
    type Filter: DeserializeOwned + Default + Send + Sync + 'static;

    fn check_create(_payload: &Self::Create) -> Result<(), String> {
        Ok(())
    }

    fn check_update(_payload: &Self::Update) -> Result<(), String> {
        Ok(())
    }

    /// Checks a partial update against the stored row it will be merged into.
    fn check_against(_current: &Self, _payload: &Self::Update) -> Result<(), String> {
        Ok(())
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>);

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>);

    /// Appends ` AND ...` clauses for the filter.
    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>);
}

// --- Builder helpers ---

type Assignments<'qb, 'a> = Separated<'qb, 'a, Postgres, &'static str>;

/// `column = COALESCE($n, column)`: absent values keep the stored one.
fn coalesce<'a, V>(set: &mut Assignments<'_, 'a>, column: &str, value: V)
where
    V: 'a + Encode<'a, Postgres> + Type<Postgres>,
{
    set.push(format_args!("{column} = COALESCE("))
        .push_bind_unseparated(value)
        .push_unseparated(format_args!(", t.{column})"));
}

fn push_eq<'a, V>(builder: &mut QueryBuilder<'a, Postgres>, column: &str, value: Option<V>)
where
    V: 'a + Encode<'a, Postgres> + Type<Postgres>,
{
    if let Some(value) = value {
        builder.push(format_args!(" AND {column} = "));
        builder.push_bind(value);
    }
}

fn push_search<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    columns: &[&str],
    search: &Option<String>,
) {
    let Some(term) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    let pattern = format!("%{term}%");
    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(format_args!("{column} ILIKE "));
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

fn not_blank(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    Ok(())
}

fn not_blank_opt(name: &str, value: &Option<String>) -> Result<(), String> {
    match value {
        Some(value) => not_blank(name, value),
        None => Ok(()),
    }
}

fn check_field_type(value: &Option<String>) -> Result<(), String> {
    match value {
        Some(value) => FieldType::from_str(value).map(|_| ()),
        None => Ok(()),
    }
}

/// Column names become JSON keys on the wire, so they are restricted to `[a-z0-9_]`.
fn check_column_name(value: &str) -> Result<(), String> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(format!("invalid column_name '{value}': use lowercase letters, digits and '_'"))
    }
}

fn check_password(value: &str) -> Result<(), String> {
    if value.chars().count() < 6 {
        return Err("password must be at least 6 characters".to_string());
    }
    Ok(())
}

// --- Tenants & form metadata ---

impl Resource for Agency {
    const KIND: EntityKind = EntityKind::Agency;
    const ORDER_BY: &'static str = "t.name, t.id";

    type Create = CreateAgencyRequest;
    type Update = UpdateAgencyRequest;
    type Filter = AgencyFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("name", &payload.name)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("name", &payload.name)
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(name, status) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.name.trim().to_string());
        values.push_bind(payload.status.unwrap_or(true));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "name", payload.name);
        coalesce(&mut set, "status", payload.status);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.status", filter.status);
        push_search(builder, &["t.name"], &filter.search);
    }
}

impl Resource for Project {
    const KIND: EntityKind = EntityKind::Project;
    const ORDER_BY: &'static str = "t.rank, t.id";

    type Create = CreateProjectRequest;
    type Update = UpdateProjectRequest;
    type Filter = ProjectFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("name", &payload.name)?;
        if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
            if start > end {
                return Err("start_date must not be after end_date".to_string());
            }
        }
        Ok(())
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("name", &payload.name)?;
        if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
            if start > end {
                return Err("start_date must not be after end_date".to_string());
            }
        }
        Ok(())
    }

    fn check_against(current: &Self, payload: &Self::Update) -> Result<(), String> {
        let start = payload.start_date.or(current.start_date);
        let end = payload.end_date.or(current.end_date);
        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                Err("start_date must not be after end_date".to_string())
            }
            _ => Ok(()),
        }
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push(
            "(agency_id, name, client, rank, status, start_date, end_date, location_status, image_required) VALUES (",
        );
        let mut values = builder.separated(", ");
        values.push_bind(payload.agency_id);
        values.push_bind(payload.name.trim().to_string());
        values.push_bind(payload.client.unwrap_or_default());
        values.push_bind(payload.rank.unwrap_or(0));
        values.push_bind(payload.status.unwrap_or(true));
        values.push_bind(payload.start_date);
        values.push_bind(payload.end_date);
        values.push_bind(payload.location_status.unwrap_or(false));
        values.push_bind(payload.image_required.unwrap_or(false));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "agency_id", payload.agency_id);
        coalesce(&mut set, "name", payload.name);
        coalesce(&mut set, "client", payload.client);
        coalesce(&mut set, "rank", payload.rank);
        coalesce(&mut set, "status", payload.status);
        coalesce(&mut set, "start_date", payload.start_date);
        coalesce(&mut set, "end_date", payload.end_date);
        coalesce(&mut set, "location_status", payload.location_status);
        coalesce(&mut set, "image_required", payload.image_required);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.agency_id", filter.agency_id);
        push_eq(builder, "t.status", filter.status);
        push_search(builder, &["t.name", "t.client"], &filter.search);
    }
}

impl Resource for FormSection {
    const KIND: EntityKind = EntityKind::FormSection;
    const ORDER_BY: &'static str = "t.project_id, t.rank, t.id";

    type Create = CreateFormSectionRequest;
    type Update = UpdateFormSectionRequest;
    type Filter = FormSectionFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("title", &payload.title)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("title", &payload.title)
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(project_id, title, rank) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.project_id);
        values.push_bind(payload.title);
        values.push_bind(payload.rank.unwrap_or(0));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "title", payload.title);
        coalesce(&mut set, "rank", payload.rank);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.project_id", filter.project_id);
    }
}

impl Resource for ProjectField {
    const KIND: EntityKind = EntityKind::ProjectField;
    const ORDER_BY: &'static str = "t.project_id, t.rank, t.id";

    type Create = CreateProjectFieldRequest;
    type Update = UpdateProjectFieldRequest;
    type Filter = ProjectFieldFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        check_column_name(&payload.column_name)?;
        not_blank("display_name", &payload.display_name)?;
        check_field_type(&payload.field_type)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        if let Some(column_name) = &payload.column_name {
            check_column_name(column_name)?;
        }
        not_blank_opt("display_name", &payload.display_name)?;
        check_field_type(&payload.field_type)
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        // Stored in canonical form so `text` and `input` never diverge.
        let field_type = payload
            .field_type
            .as_deref()
            .and_then(|raw| FieldType::from_str(raw).ok())
            .unwrap_or(FieldType::Input);
        builder.push(
            "(project_id, section_id, column_name, display_name, field_type, rank, multiple, required) VALUES (",
        );
        let mut values = builder.separated(", ");
        values.push_bind(payload.project_id);
        values.push_bind(payload.section_id);
        values.push_bind(payload.column_name);
        values.push_bind(payload.display_name);
        values.push_bind(field_type.as_str());
        values.push_bind(payload.rank.unwrap_or(0));
        values.push_bind(payload.multiple.unwrap_or(false));
        values.push_bind(payload.required.unwrap_or(false));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let field_type = payload
            .field_type
            .as_deref()
            .and_then(|raw| FieldType::from_str(raw).ok())
            .map(|ft| ft.as_str());
        let mut set = builder.separated(", ");
        coalesce(&mut set, "section_id", payload.section_id);
        coalesce(&mut set, "column_name", payload.column_name);
        coalesce(&mut set, "display_name", payload.display_name);
        coalesce(&mut set, "field_type", field_type);
        coalesce(&mut set, "rank", payload.rank);
        coalesce(&mut set, "multiple", payload.multiple);
        coalesce(&mut set, "required", payload.required);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.project_id", filter.project_id);
        push_eq(builder, "t.section_id", filter.section_id);
    }
}

impl Resource for InputOption {
    const KIND: EntityKind = EntityKind::InputOption;
    const ORDER_BY: &'static str = "t.field_id, t.rank, t.id";

    type Create = CreateInputOptionRequest;
    type Update = UpdateInputOptionRequest;
    type Filter = InputOptionFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("title", &payload.title)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("title", &payload.title)
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(field_id, title, rank) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.field_id);
        values.push_bind(payload.title);
        values.push_bind(payload.rank.unwrap_or(0));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "title", payload.title);
        coalesce(&mut set, "rank", payload.rank);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.field_id", filter.field_id);
    }
}

// --- Principals ---

impl Resource for User {
    const KIND: EntityKind = EntityKind::User;
    const ORDER_BY: &'static str = "t.name, t.id";

    type Create = CreateUserRequest;
    type Update = UpdateUserRequest;
    type Filter = UserFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("name", &payload.name)?;
        not_blank("username", &payload.username)?;
        check_password(&payload.password)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("name", &payload.name)?;
        not_blank_opt("username", &payload.username)?;
        match &payload.password {
            Some(password) => check_password(password),
            None => Ok(()),
        }
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(agency_id, name, username, password_hash, region, active) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.agency_id);
        values.push_bind(payload.name);
        values.push_bind(payload.username.trim().to_string());
        values.push_bind(hash_password(&payload.password));
        values.push_bind(payload.region.unwrap_or_default());
        values.push_bind(payload.active.unwrap_or(true));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "agency_id", payload.agency_id);
        coalesce(&mut set, "name", payload.name);
        coalesce(&mut set, "username", payload.username.map(|u| u.trim().to_string()));
        coalesce(
            &mut set,
            "password_hash",
            payload.password.map(|p| hash_password(&p)),
        );
        coalesce(&mut set, "region", payload.region);
        coalesce(&mut set, "active", payload.active);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.agency_id", filter.agency_id);
        push_eq(builder, "t.region", filter.region.clone());
        push_eq(builder, "t.active", filter.active);
        push_search(builder, &["t.name", "t.username"], &filter.search);
    }
}

impl Resource for Ba {
    const KIND: EntityKind = EntityKind::Ba;
    const ORDER_BY: &'static str = "t.name, t.id";

    type Create = CreateBaRequest;
    type Update = UpdateBaRequest;
    type Filter = BaFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("name", &payload.name)?;
        not_blank("username", &payload.username)?;
        check_password(&payload.password)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("name", &payload.name)?;
        not_blank_opt("username", &payload.username)?;
        match &payload.password {
            Some(password) => check_password(password),
            None => Ok(()),
        }
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(agency_id, name, phone, username, password_hash, active) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.agency_id);
        values.push_bind(payload.name);
        values.push_bind(payload.phone.unwrap_or_default());
        values.push_bind(payload.username.trim().to_string());
        values.push_bind(hash_password(&payload.password));
        values.push_bind(payload.active.unwrap_or(true));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "agency_id", payload.agency_id);
        coalesce(&mut set, "name", payload.name);
        coalesce(&mut set, "phone", payload.phone);
        coalesce(&mut set, "username", payload.username.map(|u| u.trim().to_string()));
        coalesce(
            &mut set,
            "password_hash",
            payload.password.map(|p| hash_password(&p)),
        );
        coalesce(&mut set, "active", payload.active);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.agency_id", filter.agency_id);
        push_eq(builder, "t.active", filter.active);
        push_search(builder, &["t.name", "t.username", "t.phone"], &filter.search);
    }
}

impl Resource for BaProject {
    const KIND: EntityKind = EntityKind::BaProject;

    type Create = CreateBaProjectRequest;
    type Update = UpdateBaProjectRequest;
    type Filter = BaProjectFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        match (payload.start_date, payload.end_date) {
            (Some(start), Some(end)) if start > end => {
                Err("start_date must not be after end_date".to_string())
            }
            _ => Ok(()),
        }
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(ba_id, project_id, start_date, end_date) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.ba_id);
        values.push_bind(payload.project_id);
        values.push_bind(payload.start_date);
        values.push_bind(payload.end_date);
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "start_date", payload.start_date);
        coalesce(&mut set, "end_date", payload.end_date);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.ba_id", filter.ba_id);
        push_eq(builder, "t.project_id", filter.project_id);
    }
}

impl Resource for UAdmin {
    const KIND: EntityKind = EntityKind::UAdmin;
    const ORDER_BY: &'static str = "t.username";

    type Create = CreateUAdminRequest;
    type Update = UpdateUAdminRequest;
    type Filter = UAdminFilter;

    fn check_create(payload: &Self::Create) -> Result<(), String> {
        not_blank("name", &payload.name)?;
        not_blank("username", &payload.username)?;
        check_password(&payload.password)
    }

    fn check_update(payload: &Self::Update) -> Result<(), String> {
        not_blank_opt("name", &payload.name)?;
        not_blank_opt("username", &payload.username)?;
        match &payload.password {
            Some(password) => check_password(password),
            None => Ok(()),
        }
    }

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(name, username, password_hash, is_superuser) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.name);
        values.push_bind(payload.username.trim().to_string());
        values.push_bind(hash_password(&payload.password));
        values.push_bind(payload.is_superuser.unwrap_or(false));
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "name", payload.name);
        coalesce(&mut set, "username", payload.username.map(|u| u.trim().to_string()));
        coalesce(
            &mut set,
            "password_hash",
            payload.password.map(|p| hash_password(&p)),
        );
        coalesce(&mut set, "is_superuser", payload.is_superuser);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_search(builder, &["t.name", "t.username"], &filter.search);
    }
}

impl Resource for UAdminAgency {
    const KIND: EntityKind = EntityKind::UAdminAgency;

    type Create = CreateUAdminAgencyRequest;
    type Update = UpdateUAdminAgencyRequest;
    type Filter = UAdminAgencyFilter;

    fn push_insert<'a>(payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("(admin_id, agency_id) VALUES (");
        let mut values = builder.separated(", ");
        values.push_bind(payload.admin_id);
        values.push_bind(payload.agency_id);
        values.push_unseparated(")");
    }

    fn push_update<'a>(payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut set = builder.separated(", ");
        coalesce(&mut set, "agency_id", payload.agency_id);
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.admin_id", filter.admin_id);
        push_eq(builder, "t.agency_id", filter.agency_id);
    }
}

// --- Submitted data ---

impl Resource for Submission {
    const KIND: EntityKind = EntityKind::Submission;
    const ORDER_BY: &'static str = "t.submitted_at DESC, t.id";
    const MUTABLE: bool = false;

    // Values are written by the form pipeline, never through the generic endpoints.
    type Create = NoUpdate;
    type Update = NoUpdate;
    type Filter = SubmissionFilter;

    fn check_create(_payload: &Self::Create) -> Result<(), String> {
        Err("submissions are created through /submit-form".to_string())
    }

    fn check_update(_payload: &Self::Update) -> Result<(), String> {
        Err("submitted values cannot be edited".to_string())
    }

    fn push_insert<'a>(_payload: Self::Create, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("DEFAULT VALUES");
    }

    fn push_update<'a>(_payload: Self::Update, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push("id = t.id");
    }

    fn push_filter<'a>(filter: &Self::Filter, builder: &mut QueryBuilder<'a, Postgres>) {
        push_eq(builder, "t.project_id", filter.project_id);
        push_eq(builder, "t.ba_id", filter.ba_id);
        push_eq(builder, "t.user_id", filter.user_id);
        push_eq(builder, "t.submission_id", filter.submission_id);
        if let Some(start) = filter.start_date {
            builder.push(" AND t.t_date >= ");
            builder.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            builder.push(" AND t.t_date <= ");
            builder.push_bind(end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_sql<R: Resource>(payload: R::Update) -> String {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} t SET ",
            R::KIND.table()
        ));
        R::push_update(payload, &mut builder);
        builder.sql().to_string()
    }

    #[test]
    fn partial_update_keeps_absent_columns() {
        let sql = update_sql::<Agency>(UpdateAgencyRequest {
            name: Some("Acme".into()),
            status: None,
        });
        assert_eq!(
            sql,
            "UPDATE agencies t SET name = COALESCE($1, t.name), status = COALESCE($2, t.status)"
        );
    }

    #[test]
    fn filters_bind_values_instead_of_interpolating() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT t.* FROM users t WHERE TRUE");
        User::push_filter(
            &UserFilter {
                agency_id: Some(3),
                region: Some("North'; DROP TABLE users; --".into()),
                active: None,
                search: Some("ann".into()),
            },
            &mut builder,
        );
        let sql = builder.sql();
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("t.agency_id = $1"));
        assert!(sql.contains("t.region = $2"));
        assert!(sql.contains("(t.name ILIKE $3 OR t.username ILIKE $4)"));
    }

    #[test]
    fn blank_search_adds_no_clause() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        Agency::push_filter(
            &AgencyFilter {
                status: None,
                search: Some("   ".into()),
            },
            &mut builder,
        );
        assert_eq!(builder.sql(), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn field_creation_rejects_unknown_type_and_bad_column() {
        let mut payload = CreateProjectFieldRequest {
            project_id: 1,
            section_id: 1,
            column_name: "shelf_count".into(),
            display_name: "Shelf count".into(),
            field_type: Some("integer".into()),
            ..Default::default()
        };
        assert!(ProjectField::check_create(&payload).is_ok());

        payload.field_type = Some("hologram".into());
        assert!(ProjectField::check_create(&payload).is_err());

        payload.field_type = Some("text".into());
        payload.column_name = "Shelf Count".into();
        assert!(ProjectField::check_create(&payload).is_err());
    }

    #[test]
    fn project_dates_must_be_ordered() {
        let payload = CreateProjectRequest {
            agency_id: 1,
            name: "Audit".into(),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 10),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1),
            ..Default::default()
        };
        assert!(Project::check_create(&payload).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let payload = CreateBaRequest {
            name: "Field Agent".into(),
            username: "fa1".into(),
            password: "123".into(),
            ..Default::default()
        };
        assert!(Ba::check_create(&payload).is_err());
    }

    #[test]
    fn submissions_are_not_writable_through_crud() {
        assert!(!Submission::MUTABLE);
        assert!(Submission::check_create(&NoUpdate {}).is_err());
    }
}
