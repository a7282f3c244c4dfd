use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgExecutor, PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use std::sync::Arc;

use crate::{
    error::RepoError,
    forms::{BaForms, FormDefinition, pivot_records},
    models::{
        Agency, Ba, BaProject, DashboardStats, FormSection, InputOption, NewSubmissionValue,
        Page, Profile, Project, ProjectField, RecordQuery, StoredCredentials, Submission,
        SubmissionFilter, SubmissionReceipt, UAdmin, UAdminAgency, User, WideRecord,
    },
    resources::Resource,
    scope::{AccessScope, EntityKind, Ownership, Principal, PrincipalKind},
};

/// ResourceStore
///
/// Scoped CRUD over one resource type. Rows the caller may not read behave as if they
/// did not exist; rows it may read but not write yield `RepoError::Forbidden`.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn list(
        &self,
        scope: &AccessScope,
        filter: &R::Filter,
        page: Page,
    ) -> Result<Vec<R>, RepoError>;
    async fn fetch(&self, scope: &AccessScope, id: i64) -> Result<R, RepoError>;
    async fn create(&self, scope: &AccessScope, payload: R::Create) -> Result<R, RepoError>;
    async fn update(
        &self,
        scope: &AccessScope,
        id: i64,
        payload: R::Update,
    ) -> Result<R, RepoError>;
    async fn delete(&self, scope: &AccessScope, id: i64) -> Result<(), RepoError>;
}

/// Repository Trait
///
/// The persistence contract used by handlers and the principal extractor. Per-entity CRUD
/// comes from the `ResourceStore` super-traits; the methods below cover authentication,
/// the form pipeline and the dashboard.
///
/// Because several `ResourceStore` super-traits share method names, callers name the
/// resource explicitly: `<dyn Repository as ResourceStore<Project>>::list(..)`.
#[async_trait]
pub trait Repository:
    ResourceStore<Agency>
    + ResourceStore<Project>
    + ResourceStore<FormSection>
    + ResourceStore<ProjectField>
    + ResourceStore<InputOption>
    + ResourceStore<User>
    + ResourceStore<Ba>
    + ResourceStore<BaProject>
    + ResourceStore<UAdmin>
    + ResourceStore<UAdminAgency>
    + ResourceStore<Submission>
    + Send
    + Sync
{
    // --- Principals ---
    async fn find_credentials(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<StoredCredentials>, RepoError>;
    // None when the account is missing or deactivated.
    async fn load_principal(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepoError>;
    async fn load_profile(&self, principal: &Principal) -> Result<Profile, RepoError>;

    // --- Forms ---
    async fn form_definition(
        &self,
        scope: &AccessScope,
        project_id: i64,
    ) -> Result<FormDefinition, RepoError>;
    async fn ba_forms(&self, scope: &AccessScope, ba_id: i64) -> Result<BaForms, RepoError>;

    // --- Submitted data ---
    // Writes all rows of one form fill atomically. Authorization happens before the call.
    async fn insert_submission(
        &self,
        values: Vec<NewSubmissionValue>,
    ) -> Result<SubmissionReceipt, RepoError>;
    // Visible value rows joined with their column name, oldest first.
    async fn submission_values(
        &self,
        scope: &AccessScope,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, RepoError>;
    async fn wide_records(
        &self,
        scope: &AccessScope,
        query: &RecordQuery,
    ) -> Result<Vec<WideRecord>, RepoError>;
    // Distinct column names of the visible form fields, optionally of one project.
    async fn visible_columns(
        &self,
        scope: &AccessScope,
        project_id: Option<i64>,
    ) -> Result<Vec<String>, RepoError>;

    // --- Dashboard & account management ---
    async fn dashboard_stats(&self, scope: &AccessScope) -> Result<DashboardStats, RepoError>;
    async fn user_regions(&self, scope: &AccessScope) -> Result<Vec<String>, RepoError>;
    async fn toggle_user_status(&self, scope: &AccessScope, id: i64) -> Result<User, RepoError>;
    async fn toggle_ba_status(&self, scope: &AccessScope, id: i64) -> Result<Ba, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL. Every
/// statement is built with `QueryBuilder` and bound parameters.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_form(&self, project: Project) -> Result<FormDefinition, RepoError> {
        let agency_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM agencies WHERE id = $1")
                .bind(project.agency_id)
                .fetch_optional(&self.pool)
                .await?;
        let sections = sqlx::query_as::<_, FormSection>(
            "SELECT * FROM form_sections WHERE project_id = $1",
        )
        .bind(project.id)
        .fetch_all(&self.pool)
        .await?;
        let fields = sqlx::query_as::<_, ProjectField>(
            "SELECT * FROM project_fields WHERE project_id = $1",
        )
        .bind(project.id)
        .fetch_all(&self.pool)
        .await?;
        let options = sqlx::query_as::<_, InputOption>(
            "SELECT o.* FROM input_options o JOIN project_fields f ON f.id = o.field_id WHERE f.project_id = $1",
        )
        .bind(project.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(FormDefinition::assemble(
            project,
            agency_name.unwrap_or_default(),
            sections,
            fields,
            options,
        ))
    }

    /// Counts visible rows of `kind`; submissions count form fills, not value rows.
    async fn count_visible(
        &self,
        scope: &AccessScope,
        kind: EntityKind,
        extra: &'static str,
    ) -> Result<i64, RepoError> {
        let counted = match kind {
            EntityKind::Submission => "COUNT(DISTINCT t.submission_id)",
            _ => "COUNT(*)",
        };
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {counted} FROM {} t WHERE ",
            kind.table()
        ));
        scope.push_visibility(kind, &mut builder);
        builder.push(extra);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn toggle_active<R: Resource>(
        &self,
        scope: &AccessScope,
        id: i64,
    ) -> Result<R, RepoError> {
        let mut tx = self.pool.begin().await?;
        let owner = ownership(&mut *tx, R::KIND, id).await?;
        authorize_existing(scope, R::KIND, owner)?;

        sqlx::query(&format!(
            "UPDATE {} SET active = NOT active WHERE id = $1",
            R::KIND.table()
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = fetch_row::<R, _>(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }
}

// --- Scope helpers ---

async fn ownership<'c, E>(
    executor: E,
    kind: EntityKind,
    id: i64,
) -> Result<Option<Ownership>, RepoError>
where
    E: PgExecutor<'c>,
{
    let sql = kind.ownership_query();
    Ok(sqlx::query_as::<_, Ownership>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

async fn fetch_row<'c, R, E>(executor: E, id: i64) -> Result<R, RepoError>
where
    R: Resource,
    E: PgExecutor<'c>,
{
    let sql = format!("SELECT t.* FROM {} t WHERE t.id = $1", R::KIND.table());
    Ok(sqlx::query_as::<_, R>(&sql).bind(id).fetch_one(executor).await?)
}

/// Checks a row that already exists: unreadable rows are reported as missing.
fn authorize_existing(
    scope: &AccessScope,
    kind: EntityKind,
    owner: Option<Ownership>,
) -> Result<(), RepoError> {
    let owner = owner.ok_or(RepoError::NotFound)?;
    if !scope.can_read(kind, &owner) {
        return Err(RepoError::NotFound);
    }
    if !scope.can_write(kind, &owner) {
        return Err(RepoError::Forbidden);
    }
    Ok(())
}

/// Checks the row as it stands after a write, before the transaction commits.
fn authorize_result(
    scope: &AccessScope,
    kind: EntityKind,
    owner: Option<Ownership>,
) -> Result<(), RepoError> {
    let owner = owner.unwrap_or_default();
    if scope.can_write(kind, &owner) {
        Ok(())
    } else {
        tracing::warn!(
            principal = ?scope.principal().kind(),
            principal_id = scope.principal().id(),
            table = kind.table(),
            "write would leave the caller's scope, rolling back"
        );
        Err(RepoError::Forbidden)
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for PostgresRepository {
    /// list
    ///
    /// Applies the caller's visibility condition, then the resource filters and paging.
    async fn list(
        &self,
        scope: &AccessScope,
        filter: &R::Filter,
        page: Page,
    ) -> Result<Vec<R>, RepoError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT t.* FROM {} t WHERE ", R::KIND.table()));
        scope.push_visibility(R::KIND, &mut builder);
        R::push_filter(filter, &mut builder);
        builder.push(format_args!(" ORDER BY {} LIMIT ", R::ORDER_BY));
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        Ok(builder.build_query_as::<R>().fetch_all(&self.pool).await?)
    }

    async fn fetch(&self, scope: &AccessScope, id: i64) -> Result<R, RepoError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT t.* FROM {} t WHERE t.id = ",
            R::KIND.table()
        ));
        builder.push_bind(id);
        builder.push(" AND ");
        scope.push_visibility(R::KIND, &mut builder);

        builder
            .build_query_as::<R>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
    }

    /// create
    ///
    /// Inserts inside a transaction, resolves the new row's ownership and rolls back
    /// unless the caller may write it.
    async fn create(&self, scope: &AccessScope, payload: R::Create) -> Result<R, RepoError> {
        if !R::MUTABLE {
            return Err(RepoError::Forbidden);
        }
        let mut tx = self.pool.begin().await?;

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("INSERT INTO {} ", R::KIND.table()));
        R::push_insert(payload, &mut builder);
        builder.push(" RETURNING id");
        let id = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let owner = ownership(&mut *tx, R::KIND, id).await?;
        authorize_result(scope, R::KIND, owner)?;

        let row = fetch_row::<R, _>(&mut *tx, id).await?;
        tx.commit().await?;
        tracing::debug!(table = R::KIND.table(), id, "row created");
        Ok(row)
    }

    /// update
    ///
    /// Partial update guarded on both sides: the row must be writable before the change,
    /// and still writable after it (a row cannot be moved out of the caller's scope).
    async fn update(
        &self,
        scope: &AccessScope,
        id: i64,
        payload: R::Update,
    ) -> Result<R, RepoError> {
        let mut tx = self.pool.begin().await?;
        let before = ownership(&mut *tx, R::KIND, id).await?;
        authorize_existing(scope, R::KIND, before)?;
        if !R::MUTABLE {
            return Err(RepoError::Forbidden);
        }
        let current = fetch_row::<R, _>(&mut *tx, id).await?;
        R::check_against(&current, &payload).map_err(RepoError::Invalid)?;

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("UPDATE {} t SET ", R::KIND.table()));
        R::push_update(payload, &mut builder);
        builder.push(" WHERE t.id = ");
        builder.push_bind(id);
        builder.build().execute(&mut *tx).await?;

        let after = ownership(&mut *tx, R::KIND, id).await?;
        authorize_result(scope, R::KIND, after)?;

        let row = fetch_row::<R, _>(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn delete(&self, scope: &AccessScope, id: i64) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        let owner = ownership(&mut *tx, R::KIND, id).await?;
        authorize_existing(scope, R::KIND, owner)?;

        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", R::KIND.table()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(table = R::KIND.table(), id, "row deleted");
        Ok(())
    }
}

fn principal_table(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::Admin => "u_admins",
        PrincipalKind::User => "users",
        PrincipalKind::Ba => "bas",
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_credentials(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<StoredCredentials>, RepoError> {
        // Platform admins have no activation flag.
        let active = match kind {
            PrincipalKind::Admin => "TRUE AS active",
            PrincipalKind::User | PrincipalKind::Ba => "active",
        };
        let sql = format!(
            "SELECT id, name, username, password_hash, {active} FROM {} WHERE username = $1",
            principal_table(kind)
        );
        Ok(sqlx::query_as::<_, StoredCredentials>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?)
    }

    /// load_principal
    ///
    /// Re-reads the relationship facts the scope rules depend on. Called on every
    /// authenticated request so revoked assignments take effect immediately.
    async fn load_principal(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepoError> {
        match kind {
            PrincipalKind::Admin => {
                let superuser: Option<bool> =
                    sqlx::query_scalar("SELECT is_superuser FROM u_admins WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                let Some(superuser) = superuser else {
                    return Ok(None);
                };
                let agency_ids: Vec<i64> = sqlx::query_scalar(
                    "SELECT agency_id FROM u_admin_agencies WHERE admin_id = $1 ORDER BY agency_id",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
                Ok(Some(Principal::PlatformAdmin {
                    id,
                    superuser,
                    agency_ids,
                }))
            }
            PrincipalKind::User => {
                let row: Option<(Option<i64>, bool)> =
                    sqlx::query_as("SELECT agency_id, active FROM users WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(row
                    .filter(|(_, active)| *active)
                    .map(|(agency_id, _)| Principal::AgencyUser { id, agency_id }))
            }
            PrincipalKind::Ba => {
                let row: Option<(Option<i64>, bool)> =
                    sqlx::query_as("SELECT agency_id, active FROM bas WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                let Some((agency_id, true)) = row else {
                    return Ok(None);
                };
                let project_ids: Vec<i64> = sqlx::query_scalar(
                    "SELECT project_id FROM ba_projects WHERE ba_id = $1 ORDER BY project_id",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
                Ok(Some(Principal::FieldAgent {
                    id,
                    agency_id,
                    project_ids,
                }))
            }
        }
    }

    async fn load_profile(&self, principal: &Principal) -> Result<Profile, RepoError> {
        let kind = principal.kind();
        let sql = format!(
            "SELECT name, username FROM {} WHERE id = $1",
            principal_table(kind)
        );
        let (name, username): (String, String) = sqlx::query_as(&sql)
            .bind(principal.id())
            .fetch_one(&self.pool)
            .await?;

        let mut profile = Profile {
            id: principal.id(),
            kind,
            name,
            username,
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

    /// form_definition
    ///
    /// Loads and assembles the form of a project visible to the caller.
    async fn form_definition(
        &self,
        scope: &AccessScope,
        project_id: i64,
    ) -> Result<FormDefinition, RepoError> {
        let project = <Self as ResourceStore<Project>>::fetch(self, scope, project_id).await?;
        self.load_form(project).await
    }

    /// ba_forms
    ///
    /// Every active project the BA is assigned to and the caller can see, rendered.
    async fn ba_forms(&self, scope: &AccessScope, ba_id: i64) -> Result<BaForms, RepoError> {
        let ba = <Self as ResourceStore<Ba>>::fetch(self, scope, ba_id).await?;
        let company: Option<String> = match ba.agency_id {
            Some(agency_id) => {
                sqlx::query_scalar("SELECT name FROM agencies WHERE id = $1")
                    .bind(agency_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT t.* FROM projects t JOIN ba_projects bp ON bp.project_id = t.id WHERE bp.ba_id = ",
        );
        builder.push_bind(ba_id);
        builder.push(" AND t.status AND ");
        scope.push_visibility(EntityKind::Project, &mut builder);
        builder.push(" ORDER BY t.rank, t.id");
        let projects = builder
            .build_query_as::<Project>()
            .fetch_all(&self.pool)
            .await?;

        let mut forms = Vec::with_capacity(projects.len());
        for project in projects {
            forms.push(self.load_form(project).await?);
        }

        Ok(BaForms {
            ba_id: ba.id,
            name: ba.name,
            company: company.unwrap_or_else(|| "Unknown Agency".to_string()),
            projects: forms,
        })
    }

    /// insert_submission
    ///
    /// A single multi-row INSERT, so a form fill is stored completely or not at all.
    async fn insert_submission(
        &self,
        values: Vec<NewSubmissionValue>,
    ) -> Result<SubmissionReceipt, RepoError> {
        let Some(first) = values.first() else {
            return Err(RepoError::InvalidReference(
                "submission has no values".to_string(),
            ));
        };
        let receipt = SubmissionReceipt {
            submission_id: first.submission_id,
            project_id: first.project_id,
            values: values.len(),
        };

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO submissions (submission_id, project_id, field_id, ba_id, user_id, value, t_date, submitted_at, latitude, longitude, image_key) ",
        );
        let submitted_at = Utc::now();
        builder.push_values(values, |mut row, value| {
            row.push_bind(value.submission_id)
                .push_bind(value.project_id)
                .push_bind(value.field_id)
                .push_bind(value.ba_id)
                .push_bind(value.user_id)
                .push_bind(Json(value.value))
                .push_bind(value.t_date)
                .push_bind(submitted_at)
                .push_bind(value.latitude)
                .push_bind(value.longitude)
                .push_bind(value.image_key);
        });
        builder.build().execute(&self.pool).await?;

        tracing::info!(
            submission_id = %receipt.submission_id,
            project_id = receipt.project_id,
            values = receipt.values,
            "submission stored"
        );
        Ok(receipt)
    }

    async fn submission_values(
        &self,
        scope: &AccessScope,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, RepoError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT t.*, f.column_name FROM submissions t JOIN project_fields f ON f.id = t.field_id WHERE ",
        );
        scope.push_visibility(EntityKind::Submission, &mut builder);
        Submission::push_filter(filter, &mut builder);
        builder.push(" ORDER BY t.submitted_at, t.id");
        Ok(builder
            .build_query_as::<Submission>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// wide_records
    ///
    /// Picks the newest `limit` visible form fills, then loads all of their rows.
    /// Every row of a fill shares its project and submitter, so visibility is decided
    /// in the inner query alone.
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
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT s.*, f.column_name FROM submissions s JOIN project_fields f ON f.id = s.field_id \
             WHERE s.submission_id IN (SELECT t.submission_id FROM submissions t WHERE ",
        );
        scope.push_visibility(EntityKind::Submission, &mut builder);
        Submission::push_filter(&filter, &mut builder);
        builder.push(" GROUP BY t.submission_id ORDER BY MAX(t.submitted_at) DESC LIMIT ");
        builder.push_bind(query.limit());
        builder.push(") ORDER BY s.submitted_at DESC, s.submission_id, f.rank, f.id");

        let rows = builder
            .build_query_as::<Submission>()
            .fetch_all(&self.pool)
            .await?;
        Ok(pivot_records(rows))
    }

    async fn visible_columns(
        &self,
        scope: &AccessScope,
        project_id: Option<i64>,
    ) -> Result<Vec<String>, RepoError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT DISTINCT t.column_name FROM project_fields t WHERE ",
        );
        scope.push_visibility(EntityKind::ProjectField, &mut builder);
        if let Some(project_id) = project_id {
            builder.push(" AND t.project_id = ");
            builder.push_bind(project_id);
        }
        builder.push(" ORDER BY t.column_name");
        Ok(builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn dashboard_stats(&self, scope: &AccessScope) -> Result<DashboardStats, RepoError> {
        Ok(DashboardStats {
            agencies: self.count_visible(scope, EntityKind::Agency, "").await?,
            projects: self.count_visible(scope, EntityKind::Project, "").await?,
            active_projects: self
                .count_visible(scope, EntityKind::Project, " AND t.status")
                .await?,
            users: self.count_visible(scope, EntityKind::User, "").await?,
            bas: self.count_visible(scope, EntityKind::Ba, "").await?,
            submissions: self
                .count_visible(scope, EntityKind::Submission, "")
                .await?,
        })
    }

    async fn user_regions(&self, scope: &AccessScope) -> Result<Vec<String>, RepoError> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT DISTINCT t.region FROM users t WHERE ");
        scope.push_visibility(EntityKind::User, &mut builder);
        builder.push(" AND t.region <> '' ORDER BY t.region");
        Ok(builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn toggle_user_status(&self, scope: &AccessScope, id: i64) -> Result<User, RepoError> {
        self.toggle_active::<User>(scope, id).await
    }

    async fn toggle_ba_status(&self, scope: &AccessScope, id: i64) -> Result<Ba, RepoError> {
        self.toggle_active::<Ba>(scope, id).await
    }
}
