//! Row-level access scope.
//!
//! Every row in the system hangs off an ownership chain
//! `agency → project → form (section, field, option) → submission`, with principals
//! (agency users, field agents, platform admins) attached to it at different points.
//! This module turns a resolved [`Principal`] into [`Condition`]s over a row's
//! [`Ownership`] for each [`EntityKind`]. The same condition is evaluated in memory
//! for write checks and compiled to SQL for list queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use ts_rs::TS;
use utoipa::ToSchema;

/// The three kinds of authenticated actor. Serialized into the `kind` claim of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PrincipalKind {
    /// Platform administrator (UAdmin).
    Admin,
    /// Office user belonging to an agency.
    User,
    /// Field agent (BA).
    Ba,
}

impl PrincipalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalKind::Admin => "admin",
            PrincipalKind::User => "user",
            PrincipalKind::Ba => "ba",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(PrincipalKind::Admin),
            "user" => Some(PrincipalKind::User),
            "ba" => Some(PrincipalKind::Ba),
            _ => None,
        }
    }
}

/// Principal
///
/// An authenticated actor together with the relationship facts the scope rules need,
/// loaded from the database on every request.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    PlatformAdmin {
        id: i64,
        superuser: bool,
        agency_ids: Vec<i64>,
    },
    AgencyUser {
        id: i64,
        agency_id: Option<i64>,
    },
    FieldAgent {
        id: i64,
        agency_id: Option<i64>,
        project_ids: Vec<i64>,
    },
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::PlatformAdmin { .. } => PrincipalKind::Admin,
            Principal::AgencyUser { .. } => PrincipalKind::User,
            Principal::FieldAgent { .. } => PrincipalKind::Ba,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Principal::PlatformAdmin { id, .. }
            | Principal::AgencyUser { id, .. }
            | Principal::FieldAgent { id, .. } => *id,
        }
    }

    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Principal::PlatformAdmin { .. })
    }

    pub fn scope(&self) -> AccessScope {
        AccessScope::of(self.clone())
    }
}

/// Entity kinds exposed through the CRUD façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agency,
    Project,
    FormSection,
    ProjectField,
    InputOption,
    User,
    Ba,
    BaProject,
    UAdmin,
    UAdminAgency,
    Submission,
}

/// SQL expressions yielding a row's ownership ids, written against the row alias `t`.
/// `None` means the kind has no such owner.
#[derive(Debug, Clone, Copy)]
pub struct OwnershipColumns {
    pub agency: Option<&'static str>,
    pub project: Option<&'static str>,
    pub ba: Option<&'static str>,
    pub admin: Option<&'static str>,
}

const AGENCY_OF_PROJECT: &str = "(SELECT p.agency_id FROM projects p WHERE p.id = t.project_id)";

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Agency,
        EntityKind::Project,
        EntityKind::FormSection,
        EntityKind::ProjectField,
        EntityKind::InputOption,
        EntityKind::User,
        EntityKind::Ba,
        EntityKind::BaProject,
        EntityKind::UAdmin,
        EntityKind::UAdminAgency,
        EntityKind::Submission,
    ];

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Agency => "agencies",
            EntityKind::Project => "projects",
            EntityKind::FormSection => "form_sections",
            EntityKind::ProjectField => "project_fields",
            EntityKind::InputOption => "input_options",
            EntityKind::User => "users",
            EntityKind::Ba => "bas",
            EntityKind::BaProject => "ba_projects",
            EntityKind::UAdmin => "u_admins",
            EntityKind::UAdminAgency => "u_admin_agencies",
            EntityKind::Submission => "submissions",
        }
    }

    pub fn ownership_columns(self) -> OwnershipColumns {
        let none = OwnershipColumns {
            agency: None,
            project: None,
            ba: None,
            admin: None,
        };
        match self {
            EntityKind::Agency => OwnershipColumns {
                agency: Some("t.id"),
                ..none
            },
            EntityKind::Project => OwnershipColumns {
                agency: Some("t.agency_id"),
                project: Some("t.id"),
                ..none
            },
            EntityKind::FormSection | EntityKind::ProjectField => OwnershipColumns {
                agency: Some(AGENCY_OF_PROJECT),
                project: Some("t.project_id"),
                ..none
            },
            EntityKind::InputOption => OwnershipColumns {
                agency: Some(
                    "(SELECT p.agency_id FROM project_fields f JOIN projects p ON p.id = f.project_id WHERE f.id = t.field_id)",
                ),
                project: Some(
                    "(SELECT f.project_id FROM project_fields f WHERE f.id = t.field_id)",
                ),
                ..none
            },
            EntityKind::User => OwnershipColumns {
                agency: Some("t.agency_id"),
                ..none
            },
            EntityKind::Ba => OwnershipColumns {
                agency: Some("t.agency_id"),
                ba: Some("t.id"),
                ..none
            },
            // Owned by an agency only when the BA and the project agree on it.
            EntityKind::BaProject => OwnershipColumns {
                agency: Some(
                    "(SELECT p.agency_id FROM projects p JOIN bas b ON b.agency_id = p.agency_id WHERE p.id = t.project_id AND b.id = t.ba_id)",
                ),
                project: Some("t.project_id"),
                ba: Some("t.ba_id"),
                ..none
            },
            EntityKind::UAdmin => OwnershipColumns {
                admin: Some("t.id"),
                ..none
            },
            EntityKind::UAdminAgency => OwnershipColumns {
                agency: Some("t.agency_id"),
                admin: Some("t.admin_id"),
                ..none
            },
            EntityKind::Submission => OwnershipColumns {
                agency: Some(AGENCY_OF_PROJECT),
                project: Some("t.project_id"),
                ba: Some("t.ba_id"),
                ..none
            },
        }
    }

    /// `SELECT` resolving the ownership of one row; binds the row id as `$1`.
    pub fn ownership_query(self) -> String {
        let cols = self.ownership_columns();
        let expr = |e: Option<&str>| e.unwrap_or("NULL::BIGINT").to_string();
        format!(
            "SELECT {} AS agency_id, {} AS project_id, {} AS ba_id, {} AS admin_id FROM {} t WHERE t.id = $1",
            expr(cols.agency),
            expr(cols.project),
            expr(cols.ba),
            expr(cols.admin),
            self.table()
        )
    }
}

/// The owners of a single row, resolved by walking its foreign keys.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct Ownership {
    pub agency_id: Option<i64>,
    pub project_id: Option<i64>,
    pub ba_id: Option<i64>,
    pub admin_id: Option<i64>,
}

/// Condition
///
/// A predicate over a row's [`Ownership`]. Conditions only compare ids, so a missing
/// owner never satisfies them.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    Never,
    AgencyIn(Vec<i64>),
    ProjectIn(Vec<i64>),
    BaIs(i64),
    AdminIs(i64),
    All(Vec<Condition>),
}

impl Condition {
    fn agency(agency_id: Option<i64>) -> Condition {
        match agency_id {
            Some(id) => Condition::AgencyIn(vec![id]),
            None => Condition::Never,
        }
    }

    pub fn holds(&self, owner: &Ownership) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::AgencyIn(ids) => owner.agency_id.is_some_and(|id| ids.contains(&id)),
            Condition::ProjectIn(ids) => owner.project_id.is_some_and(|id| ids.contains(&id)),
            Condition::BaIs(ba) => owner.ba_id == Some(*ba),
            Condition::AdminIs(admin) => owner.admin_id == Some(*admin),
            Condition::All(parts) => parts.iter().all(|c| c.holds(owner)),
        }
    }

    /// push_sql
    ///
    /// Appends the condition as a boolean SQL expression over the ownership expressions
    /// of `kind`. Ids are always bound, never interpolated.
    pub fn push_sql<'a>(&self, kind: EntityKind, builder: &mut QueryBuilder<'a, Postgres>) {
        let cols = kind.ownership_columns();
        match self {
            Condition::Always => {
                builder.push("TRUE");
            }
            Condition::Never => {
                builder.push("FALSE");
            }
            Condition::AgencyIn(ids) => push_any(builder, cols.agency, ids),
            Condition::ProjectIn(ids) => push_any(builder, cols.project, ids),
            Condition::BaIs(id) => push_eq(builder, cols.ba, *id),
            Condition::AdminIs(id) => push_eq(builder, cols.admin, *id),
            Condition::All(parts) if parts.is_empty() => {
                builder.push("TRUE");
            }
            Condition::All(parts) => {
                builder.push("(");
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        builder.push(" AND ");
                    }
                    part.push_sql(kind, builder);
                }
                builder.push(")");
            }
        }
    }
}

fn push_any<'a>(builder: &mut QueryBuilder<'a, Postgres>, expr: Option<&str>, ids: &[i64]) {
    match expr {
        Some(expr) => {
            builder.push(expr);
            builder.push(" = ANY(");
            builder.push_bind(ids.to_vec());
            builder.push(")");
        }
        None => {
            builder.push("FALSE");
        }
    }
}

fn push_eq<'a>(builder: &mut QueryBuilder<'a, Postgres>, expr: Option<&str>, id: i64) {
    match expr {
        Some(expr) => {
            builder.push(expr);
            builder.push(" = ");
            builder.push_bind(id);
        }
        None => {
            builder.push("FALSE");
        }
    }
}

/// AccessScope
///
/// The access scope calculator: per principal kind, derives which rows of each entity
/// kind may be read and which may be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessScope {
    principal: Principal,
}

impl AccessScope {
    pub fn of(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn read_condition(&self, kind: EntityKind) -> Condition {
        use EntityKind as K;
        match &self.principal {
            Principal::PlatformAdmin {
                superuser: true, ..
            } => Condition::Always,
            Principal::PlatformAdmin {
                id, agency_ids, ..
            } => match kind {
                K::UAdmin | K::UAdminAgency => Condition::AdminIs(*id),
                _ => Condition::AgencyIn(agency_ids.clone()),
            },
            Principal::AgencyUser { agency_id, .. } => match kind {
                K::UAdmin | K::UAdminAgency => Condition::Never,
                _ => Condition::agency(*agency_id),
            },
            Principal::FieldAgent {
                id,
                agency_id,
                project_ids,
            } => match kind {
                K::Agency => Condition::agency(*agency_id),
                K::Project | K::FormSection | K::ProjectField | K::InputOption => {
                    Condition::ProjectIn(project_ids.clone())
                }
                K::Ba | K::BaProject => Condition::BaIs(*id),
                K::Submission => Condition::All(vec![
                    Condition::BaIs(*id),
                    Condition::ProjectIn(project_ids.clone()),
                ]),
                K::User | K::UAdmin | K::UAdminAgency => Condition::Never,
            },
        }
    }

    pub fn write_condition(&self, kind: EntityKind) -> Condition {
        use EntityKind as K;
        match &self.principal {
            Principal::PlatformAdmin {
                superuser: true, ..
            } => Condition::Always,
            Principal::PlatformAdmin { agency_ids, .. } => match kind {
                K::UAdmin | K::UAdminAgency => Condition::Never,
                _ => Condition::AgencyIn(agency_ids.clone()),
            },
            Principal::AgencyUser { agency_id, .. } => match kind {
                K::Agency | K::User | K::UAdmin | K::UAdminAgency => Condition::Never,
                _ => Condition::agency(*agency_id),
            },
            Principal::FieldAgent {
                id, project_ids, ..
            } => match kind {
                K::Submission => Condition::All(vec![
                    Condition::BaIs(*id),
                    Condition::ProjectIn(project_ids.clone()),
                ]),
                _ => Condition::Never,
            },
        }
    }

    pub fn can_read(&self, kind: EntityKind, owner: &Ownership) -> bool {
        self.read_condition(kind).holds(owner)
    }

    pub fn can_write(&self, kind: EntityKind, owner: &Ownership) -> bool {
        self.write_condition(kind).holds(owner)
    }

    /// Appends the read condition for `kind` to a query whose row alias is `t`.
    pub fn push_visibility<'a>(&self, kind: EntityKind, builder: &mut QueryBuilder<'a, Postgres>) {
        self.read_condition(kind).push_sql(kind, builder);
    }
}
