//! Shared test scaffolding.
//!
//! `MockRepo` keeps every row as JSON and applies the real `AccessScope` rules to an
//! ownership it derives from the row's foreign keys, so handler tests exercise the same
//! visibility decisions as the Postgres repository. SQL-level filters are not emulated.
#![allow(dead_code)]

use async_trait::async_trait;
use baims_api::{
    AppConfig, AppState, create_router,
    credentials::hash_password,
    error::RepoError,
    forms::{BaForms, FormDefinition, pivot_records},
    models::{
        Agency, Ba, BaProject, DashboardStats, FormSection, InputOption, NewSubmissionValue,
        Page, Profile, Project, ProjectField, RecordQuery, StoredCredentials, Submission,
        SubmissionFilter, SubmissionReceipt, UAdmin, UAdminAgency, User, WideRecord,
    },
    repository::{Repository, RepositoryState, ResourceStore},
    resources::Resource,
    scope::{AccessScope, EntityKind, Ownership, Principal, PrincipalKind},
    storage::{MockStorageService, StorageState},
};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::types::Json;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    },
};
use tokio::net::TcpListener;

type Rows = HashMap<EntityKind, Vec<Value>>;

// --- MOCK REPOSITORY ---

#[derive(Default)]
pub struct MockRepo {
    rows: Mutex<Rows>,
    principals: HashMap<(PrincipalKind, i64), Principal>,
    credentials: HashMap<(PrincipalKind, String), StoredCredentials>,
    forms: HashMap<i64, FormDefinition>,
    stored: Mutex<Vec<Submission>>,
    next_id: AtomicI64,
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals
            .insert((principal.kind(), principal.id()), principal);
        self
    }

    pub fn with_row<R: Resource>(mut self, row: R) -> Self {
        let value = serde_json::to_value(&row).expect("row serializes");
        self.rows
            .get_mut()
            .unwrap()
            .entry(R::KIND)
            .or_default()
            .push(value);
        self
    }

    /// Registers the form and its project row.
    pub fn with_form(mut self, form: FormDefinition) -> Self {
        let project = form.project.clone();
        self.forms.insert(project.id, form);
        self.with_row(project)
    }

    pub fn with_login(
        mut self,
        kind: PrincipalKind,
        id: i64,
        username: &str,
        password: &str,
        active: bool,
    ) -> Self {
        self.credentials.insert(
            (kind, username.to_string()),
            StoredCredentials {
                id,
                name: format!("{} {}", kind.as_str(), id),
                username: username.to_string(),
                password_hash: hash_password(password),
                active,
            },
        );
        self
    }

    pub fn stored_submissions(&self) -> Vec<Submission> {
        self.stored.lock().unwrap().clone()
    }

    pub fn rows_of(&self, kind: EntityKind) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn next_id(&self) -> i64 {
        1000 + self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn project_agency(&self, rows: &Rows, project_id: i64) -> Option<i64> {
        find(rows, EntityKind::Project, project_id)
            .and_then(|p| int(p, "agency_id"))
            .or_else(|| self.forms.get(&project_id).map(|f| f.project.agency_id))
    }

    /// Mirrors the ownership chain walked by the SQL ownership queries.
    fn ownership(&self, rows: &Rows, kind: EntityKind, row: &Value) -> Ownership {
        let id = int(row, "id");
        let mut owner = Ownership {
            agency_id: int(row, "agency_id"),
            project_id: int(row, "project_id"),
            ba_id: int(row, "ba_id"),
            admin_id: int(row, "admin_id"),
        };
        match kind {
            EntityKind::Agency => owner.agency_id = id,
            EntityKind::Project => owner.project_id = id,
            EntityKind::Ba => owner.ba_id = id,
            EntityKind::UAdmin => owner.admin_id = id,
            EntityKind::InputOption => {
                owner.project_id = int(row, "field_id")
                    .and_then(|field_id| find(rows, EntityKind::ProjectField, field_id))
                    .and_then(|field| int(field, "project_id"));
            }
            // Owned by an agency only when the BA and the project agree on it.
            EntityKind::BaProject => {
                let ba_agency = owner
                    .ba_id
                    .and_then(|ba_id| find(rows, EntityKind::Ba, ba_id))
                    .and_then(|ba| int(ba, "agency_id"));
                let project_agency = owner
                    .project_id
                    .and_then(|project_id| self.project_agency(rows, project_id));
                owner.agency_id = project_agency.filter(|agency| ba_agency == Some(*agency));
                return owner;
            }
            _ => {}
        }
        if owner.agency_id.is_none() {
            owner.agency_id = owner
                .project_id
                .and_then(|project_id| self.project_agency(rows, project_id));
        }
        owner
    }

    fn authorize(
        &self,
        rows: &Rows,
        scope: &AccessScope,
        kind: EntityKind,
        id: i64,
    ) -> Result<usize, RepoError> {
        let list = rows.get(&kind).ok_or(RepoError::NotFound)?;
        let position = list
            .iter()
            .position(|row| int(row, "id") == Some(id))
            .ok_or(RepoError::NotFound)?;
        let owner = self.ownership(rows, kind, &list[position]);
        if !scope.can_read(kind, &owner) {
            return Err(RepoError::NotFound);
        }
        if !scope.can_write(kind, &owner) {
            return Err(RepoError::Forbidden);
        }
        Ok(position)
    }

    fn visible(&self, scope: &AccessScope, kind: EntityKind) -> Vec<Value> {
        let rows = self.rows.lock().unwrap();
        rows.get(&kind)
            .into_iter()
            .flatten()
            .filter(|row| scope.can_read(kind, &self.ownership(&rows, kind, row)))
            .cloned()
            .collect()
    }

    fn toggle<R: Resource>(&self, scope: &AccessScope, id: i64) -> Result<R, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let position = self.authorize(&rows, scope, R::KIND, id)?;
        let list = rows.get_mut(&R::KIND).ok_or(RepoError::NotFound)?;
        let active = list[position]["active"].as_bool().unwrap_or(false);
        list[position]["active"] = Value::from(!active);
        decode(list[position].clone())
    }
}

fn int(row: &Value, key: &str) -> Option<i64> {
    row.get(key).and_then(Value::as_i64)
}

fn find(rows: &Rows, kind: EntityKind, id: i64) -> Option<&Value> {
    rows.get(&kind)?
        .iter()
        .find(|row| int(row, "id") == Some(id))
}

fn decode<R: DeserializeOwned>(row: Value) -> Result<R, RepoError> {
    serde_json::from_value(row).map_err(|e| RepoError::InvalidReference(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RepoError> {
    serde_json::to_value(value).map_err(|e| RepoError::InvalidReference(e.to_string()))
}

/// Copies the non-null payload keys the row already knows about.
fn merge(target: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            if !value.is_null() && target.contains_key(&key) {
                target.insert(key, value);
            }
        }
    }
}

#[async_trait]
impl<R> ResourceStore<R> for MockRepo
where
    R: Resource + Default,
    R::Create: Serialize,
    R::Update: Serialize,
{
    async fn list(
        &self,
        scope: &AccessScope,
        _filter: &R::Filter,
        page: Page,
    ) -> Result<Vec<R>, RepoError> {
        self.visible(scope, R::KIND)
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(decode::<R>)
            .collect()
    }

    async fn fetch(&self, scope: &AccessScope, id: i64) -> Result<R, RepoError> {
        self.visible(scope, R::KIND)
            .into_iter()
            .find(|row| int(row, "id") == Some(id))
            .ok_or(RepoError::NotFound)
            .and_then(decode::<R>)
    }

    async fn create(&self, scope: &AccessScope, payload: R::Create) -> Result<R, RepoError> {
        if !R::MUTABLE {
            return Err(RepoError::Forbidden);
        }
        let mut row = encode(&R::default())?;
        merge(&mut row, encode(&payload)?);
        row["id"] = Value::from(self.next_id());

        let mut rows = self.rows.lock().unwrap();
        if !scope.can_write(R::KIND, &self.ownership(&rows, R::KIND, &row)) {
            return Err(RepoError::Forbidden);
        }
        let created = decode::<R>(row.clone())?;
        rows.entry(R::KIND).or_default().push(row);
        Ok(created)
    }

    async fn update(
        &self,
        scope: &AccessScope,
        id: i64,
        payload: R::Update,
    ) -> Result<R, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let position = self.authorize(&rows, scope, R::KIND, id)?;
        if !R::MUTABLE {
            return Err(RepoError::Forbidden);
        }
        let mut row = rows[&R::KIND][position].clone();
        R::check_against(&decode::<R>(row.clone())?, &payload).map_err(RepoError::Invalid)?;
        merge(&mut row, encode(&payload)?);
        if !scope.can_write(R::KIND, &self.ownership(&rows, R::KIND, &row)) {
            return Err(RepoError::Forbidden);
        }
        let updated = decode::<R>(row.clone())?;
        if let Some(list) = rows.get_mut(&R::KIND) {
            list[position] = row;
        }
        Ok(updated)
    }

    async fn delete(&self, scope: &AccessScope, id: i64) -> Result<(), RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let position = self.authorize(&rows, scope, R::KIND, id)?;
        if let Some(list) = rows.get_mut(&R::KIND) {
            list.remove(position);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn find_credentials(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<StoredCredentials>, RepoError> {
        Ok(self
            .credentials
            .get(&(kind, username.trim().to_string()))
            .cloned())
    }

    async fn load_principal(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepoError> {
        Ok(self.principals.get(&(kind, id)).cloned())
    }

    async fn load_profile(&self, principal: &Principal) -> Result<Profile, RepoError> {
        let kind = principal.kind();
        let mut profile = Profile {
            id: principal.id(),
            kind,
            name: format!("{} {}", kind.as_str(), principal.id()),
            username: format!("{}{}", kind.as_str(), principal.id()),
            agency_id: None,
            agency_ids: Vec::new(),
            project_ids: Vec::new(),
            superuser: false,
        };
        match principal {
            Principal::PlatformAdmin {
                superuser,
                agency_ids,
                ..
            } => {
                profile.superuser = *superuser;
                profile.agency_ids = agency_ids.clone();
            }
            Principal::AgencyUser { agency_id, .. } => {
                profile.agency_id = *agency_id;
                profile.agency_ids = agency_id.iter().copied().collect();
            }
            Principal::FieldAgent {
                agency_id,
                project_ids,
                ..
            } => {
                profile.agency_id = *agency_id;
                profile.agency_ids = agency_id.iter().copied().collect();
                profile.project_ids = project_ids.clone();
            }
        }
        Ok(profile)
    }

    async fn form_definition(
        &self,
        scope: &AccessScope,
        project_id: i64,
    ) -> Result<FormDefinition, RepoError> {
        let form = self.forms.get(&project_id).ok_or(RepoError::NotFound)?;
        let owner = Ownership {
            agency_id: Some(form.project.agency_id),
            project_id: Some(form.project.id),
            ..Default::default()
        };
        if !scope.can_read(EntityKind::Project, &owner) {
            return Err(RepoError::NotFound);
        }
        Ok(form.clone())
    }

    async fn ba_forms(&self, scope: &AccessScope, ba_id: i64) -> Result<BaForms, RepoError> {
        let ba = <Self as ResourceStore<Ba>>::fetch(self, scope, ba_id).await?;
        let rows = self.rows.lock().unwrap();

        let company = ba
            .agency_id
            .and_then(|agency_id| find(&rows, EntityKind::Agency, agency_id))
            .and_then(|agency| agency["name"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown Agency".to_string());

        let mut projects: Vec<FormDefinition> = rows
            .get(&EntityKind::BaProject)
            .into_iter()
            .flatten()
            .filter(|assignment| int(assignment, "ba_id") == Some(ba_id))
            .filter_map(|assignment| int(assignment, "project_id"))
            .filter_map(|project_id| self.forms.get(&project_id))
            .filter(|form| form.project.status)
            .filter(|form| {
                let owner = Ownership {
                    agency_id: Some(form.project.agency_id),
                    project_id: Some(form.project.id),
                    ..Default::default()
                };
                scope.can_read(EntityKind::Project, &owner)
            })
            .cloned()
            .collect();
        projects.sort_by_key(|form| (form.project.rank, form.project.id));

        Ok(BaForms {
            ba_id: ba.id,
            name: ba.name,
            company,
            projects,
        })
    }

    async fn insert_submission(
        &self,
        values: Vec<NewSubmissionValue>,
    ) -> Result<SubmissionReceipt, RepoError> {
        let first = values
            .first()
            .ok_or_else(|| RepoError::InvalidReference("submission has no values".to_string()))?;
        let receipt = SubmissionReceipt {
            submission_id: first.submission_id,
            project_id: first.project_id,
            values: values.len(),
        };

        let mut stored = self.stored.lock().unwrap();
        for value in values {
            let column_name = self
                .forms
                .get(&value.project_id)
                .and_then(|form| form.fields().find(|f| f.field.id == value.field_id))
                .map(|f| f.field.column_name.clone());
            stored.push(Submission {
                id: self.next_id(),
                submission_id: value.submission_id,
                project_id: value.project_id,
                field_id: value.field_id,
                ba_id: value.ba_id,
                user_id: value.user_id,
                value: Json(value.value),
                t_date: value.t_date,
                submitted_at: Utc::now(),
                latitude: value.latitude,
                longitude: value.longitude,
                image_key: value.image_key,
                column_name,
            });
        }
        Ok(receipt)
    }

    async fn submission_values(
        &self,
        scope: &AccessScope,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, RepoError> {
        let rows = self.rows.lock().unwrap();
        let stored = self.stored.lock().unwrap();
        Ok(stored
            .iter()
            .filter(|s| {
                let owner = Ownership {
                    agency_id: self.project_agency(&rows, s.project_id),
                    project_id: Some(s.project_id),
                    ba_id: s.ba_id,
                    admin_id: None,
                };
                scope.can_read(EntityKind::Submission, &owner)
            })
            .filter(|s| filter.project_id.is_none_or(|id| s.project_id == id))
            .filter(|s| filter.ba_id.is_none_or(|id| s.ba_id == Some(id)))
            .filter(|s| filter.user_id.is_none_or(|id| s.user_id == Some(id)))
            .filter(|s| filter.submission_id.is_none_or(|id| s.submission_id == id))
            .filter(|s| filter.start_date.is_none_or(|d| s.t_date >= d))
            .filter(|s| filter.end_date.is_none_or(|d| s.t_date <= d))
            .cloned()
            .collect())
    }

    async fn wide_records(
        &self,
        scope: &AccessScope,
        query: &RecordQuery,
    ) -> Result<Vec<WideRecord>, RepoError> {
        let filter = SubmissionFilter {
            project_id: query.project_id,
            ba_id: query.ba_id,
            start_date: query.start_date,
            end_date: query.end_date,
            ..Default::default()
        };
        let mut rows = self.submission_values(scope, &filter).await?;
        rows.reverse();
        let mut records = pivot_records(rows);
        records.truncate(query.limit() as usize);
        Ok(records)
    }

    async fn visible_columns(
        &self,
        scope: &AccessScope,
        project_id: Option<i64>,
    ) -> Result<Vec<String>, RepoError> {
        let in_project = |id: Option<i64>| project_id.is_none() || id == project_id;
        let mut columns: Vec<String> = self
            .visible(scope, EntityKind::ProjectField)
            .iter()
            .filter(|field| in_project(int(field, "project_id")))
            .filter_map(|field| field["column_name"].as_str().map(str::to_string))
            .collect();
        for form in self.forms.values() {
            let owner = Ownership {
                agency_id: Some(form.project.agency_id),
                project_id: Some(form.project.id),
                ..Default::default()
            };
            if in_project(Some(form.project.id))
                && scope.can_read(EntityKind::ProjectField, &owner)
            {
                columns.extend(form.fields().map(|field| field.field.column_name.clone()));
            }
        }
        columns.sort();
        columns.dedup();
        Ok(columns)
    }

    async fn dashboard_stats(&self, scope: &AccessScope) -> Result<DashboardStats, RepoError> {
        let projects = self.visible(scope, EntityKind::Project);
        let submissions = self
            .submission_values(scope, &SubmissionFilter::default())
            .await?;
        Ok(DashboardStats {
            agencies: self.visible(scope, EntityKind::Agency).len() as i64,
            projects: projects.len() as i64,
            active_projects: projects
                .iter()
                .filter(|p| p["status"].as_bool() == Some(true))
                .count() as i64,
            users: self.visible(scope, EntityKind::User).len() as i64,
            bas: self.visible(scope, EntityKind::Ba).len() as i64,
            submissions: submissions
                .iter()
                .map(|row| row.submission_id)
                .collect::<HashSet<_>>()
                .len() as i64,
        })
    }

    async fn user_regions(&self, scope: &AccessScope) -> Result<Vec<String>, RepoError> {
        let mut regions: Vec<String> = self
            .visible(scope, EntityKind::User)
            .iter()
            .filter_map(|user| user["region"].as_str().map(str::to_string))
            .filter(|region| !region.is_empty())
            .collect();
        regions.sort();
        regions.dedup();
        Ok(regions)
    }

    async fn toggle_user_status(&self, scope: &AccessScope, id: i64) -> Result<User, RepoError> {
        self.toggle::<User>(scope, id)
    }

    async fn toggle_ba_status(&self, scope: &AccessScope, id: i64) -> Result<Ba, RepoError> {
        self.toggle::<Ba>(scope, id)
    }
}

// --- FIXTURES ---

pub const ACME: i64 = 1;
pub const OTHER_CO: i64 = 2;
/// Active project of ACME.
pub const SURVEY: i64 = 10;
/// Inactive project of ACME.
pub const ARCHIVED: i64 = 11;
/// Active project of OTHER_CO.
pub const FOREIGN: i64 = 20;

pub const SUPERUSER: &str = "admin:1";
pub const SCOPED_ADMIN: &str = "admin:2";
pub const ACME_USER: &str = "user:5";
pub const OTHER_USER: &str = "user:6";
pub const ACME_BA: &str = "ba:7";
pub const IDLE_BA: &str = "ba:8";

pub fn project(id: i64, agency_id: i64, status: bool) -> Project {
    Project {
        id,
        agency_id,
        name: format!("Project {id}"),
        client: "Retail".to_string(),
        status,
        ..Default::default()
    }
}

/// One section with a required text field, an integer, a single-choice select and a
/// date. Field ids are derived from the project id so forms never share them.
pub fn survey_form(project: Project) -> FormDefinition {
    let base = project.id * 100;
    let section = FormSection {
        id: base,
        project_id: project.id,
        title: "Shop visit".to_string(),
        rank: 1,
    };
    let field = |offset: i64, column: &str, field_type: &str, required: bool| ProjectField {
        id: base + offset,
        project_id: project.id,
        section_id: base,
        column_name: column.to_string(),
        display_name: column.replace('_', " "),
        field_type: field_type.to_string(),
        rank: offset as i32,
        multiple: false,
        required,
    };
    let fields = vec![
        field(1, "shop_name", "input", true),
        field(2, "visits", "integer", false),
        field(3, "brand", "select", false),
        field(4, "opened_on", "date", false),
    ];
    let options = vec![
        InputOption {
            id: base + 51,
            field_id: base + 3,
            title: "Alpha".to_string(),
            rank: 1,
        },
        InputOption {
            id: base + 52,
            field_id: base + 3,
            title: "Beta".to_string(),
            rank: 2,
        },
    ];
    FormDefinition::assemble(project, String::new(), vec![section], fields, options)
}

/// Two agencies, three projects and one principal of every kind.
pub fn seeded_repo() -> MockRepo {
    MockRepo::new()
        .with_row(Agency {
            id: ACME,
            name: "Acme Field".to_string(),
            status: true,
            ..Default::default()
        })
        .with_row(Agency {
            id: OTHER_CO,
            name: "Other Co".to_string(),
            status: true,
            ..Default::default()
        })
        .with_form(survey_form(project(SURVEY, ACME, true)))
        .with_form(survey_form(project(ARCHIVED, ACME, false)))
        .with_form(survey_form(project(FOREIGN, OTHER_CO, true)))
        .with_row(User {
            id: 5,
            agency_id: Some(ACME),
            name: "Ana".to_string(),
            username: "ana".to_string(),
            region: "North".to_string(),
            active: true,
            ..Default::default()
        })
        .with_row(User {
            id: 6,
            agency_id: Some(OTHER_CO),
            name: "Oto".to_string(),
            username: "oto".to_string(),
            region: "South".to_string(),
            active: true,
            ..Default::default()
        })
        .with_row(Ba {
            id: 7,
            agency_id: Some(ACME),
            name: "Bea".to_string(),
            username: "bea".to_string(),
            active: true,
            ..Default::default()
        })
        .with_row(Ba {
            id: 8,
            agency_id: Some(ACME),
            name: "Ben".to_string(),
            username: "ben".to_string(),
            active: true,
            ..Default::default()
        })
        .with_row(BaProject {
            id: 70,
            ba_id: 7,
            project_id: SURVEY,
            ..Default::default()
        })
        .with_row(BaProject {
            id: 71,
            ba_id: 7,
            project_id: ARCHIVED,
            ..Default::default()
        })
        .with_row(UAdmin {
            id: 1,
            name: "Root".to_string(),
            username: "root".to_string(),
            is_superuser: true,
            ..Default::default()
        })
        .with_row(UAdmin {
            id: 2,
            name: "Scoped".to_string(),
            username: "scoped".to_string(),
            ..Default::default()
        })
        .with_row(UAdminAgency {
            id: 20,
            admin_id: 2,
            agency_id: OTHER_CO,
        })
        .with_principal(Principal::PlatformAdmin {
            id: 1,
            superuser: true,
            agency_ids: vec![],
        })
        .with_principal(Principal::PlatformAdmin {
            id: 2,
            superuser: false,
            agency_ids: vec![OTHER_CO],
        })
        .with_principal(Principal::AgencyUser {
            id: 5,
            agency_id: Some(ACME),
        })
        .with_principal(Principal::AgencyUser {
            id: 6,
            agency_id: Some(OTHER_CO),
        })
        .with_principal(Principal::FieldAgent {
            id: 7,
            agency_id: Some(ACME),
            project_ids: vec![SURVEY, ARCHIVED],
        })
        .with_principal(Principal::FieldAgent {
            id: 8,
            agency_id: Some(ACME),
            project_ids: vec![],
        })
}

// --- TEST SERVER ---

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MockRepo>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// GET with the local `x-principal` bypass.
    pub async fn get_as(&self, principal: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-principal", principal)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn post_as(&self, principal: &str, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-principal", principal)
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn delete_as(&self, principal: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("x-principal", principal)
            .send()
            .await
            .expect("request failed")
    }
}

pub async fn spawn_app(repo: MockRepo) -> TestApp {
    spawn_app_with(repo, MockStorageService::new(), AppConfig::default()).await
}

pub async fn spawn_app_with(
    repo: MockRepo,
    storage: MockStorageService,
    config: AppConfig,
) -> TestApp {
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        repo,
        client: reqwest::Client::new(),
    }
}
