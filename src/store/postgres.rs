//! Postgres `ProposalStore`.
//!
//! Conditional writes take a `FOR UPDATE` row lock inside a transaction,
//! check the status, and write the whole row back before commit. Conversion
//! additionally holds `pg_advisory_xact_lock(hashtext(prefix))` while it reads
//! the existing codes and inserts the new project, and the `projects.code`
//! unique index backs the invariant. Dropping a transaction (request
//! cancelled) rolls everything back.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use portal_types::{ProjectCategory, ProjectStatus, ProposalStatus};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ProposalQuery, ProposalStore};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    Project, ProjectDraft, Proposal, ProposalFields, SpecialArea, StatusChange, Vertical,
};
use crate::rbac::policy::{ReviewerSlot, VisibilityScope};
use crate::workflow::codes::{next_project_code, CodePrefix};

const PROPOSAL_COLUMNS: &str = r#"
    id, title, description, category, vertical_id, special_area_id, submitted_by_id,
    objectives, methodology, expected_outcome, proposed_start_date, proposed_end_date,
    estimated_budget, status,
    bkmd_reviewer_id, bkmd_reviewed_at, bkmd_comments,
    director_reviewer_id, director_reviewed_at, director_comments,
    rc_meeting_id, rc_comments, converted_project_id, created_at, updated_at
"#;

const PROJECT_COLUMNS: &str = r#"
    id, code, title, description, category, vertical_id, special_area_id, project_head_id,
    objectives, methodology, expected_outcome, start_date, end_date, status, created_at
"#;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProposalRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    category: String,
    vertical_id: String,
    special_area_id: Option<String>,
    submitted_by_id: String,
    objectives: Option<String>,
    methodology: Option<String>,
    expected_outcome: Option<String>,
    proposed_start_date: NaiveDate,
    proposed_end_date: NaiveDate,
    estimated_budget: Option<Decimal>,
    status: String,
    bkmd_reviewer_id: Option<String>,
    bkmd_reviewed_at: Option<DateTime<Utc>>,
    bkmd_comments: Option<String>,
    director_reviewer_id: Option<String>,
    director_reviewed_at: Option<DateTime<Utc>>,
    director_comments: Option<String>,
    rc_meeting_id: Option<String>,
    rc_comments: Option<String>,
    converted_project_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = StoreError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        Ok(Proposal {
            id: row.id,
            title: row.title,
            description: row.description,
            category: parse_column::<ProjectCategory>(&row.category)?,
            vertical_id: row.vertical_id,
            special_area_id: row.special_area_id,
            submitted_by_id: row.submitted_by_id,
            objectives: row.objectives,
            methodology: row.methodology,
            expected_outcome: row.expected_outcome,
            proposed_start_date: row.proposed_start_date,
            proposed_end_date: row.proposed_end_date,
            estimated_budget: row.estimated_budget,
            status: parse_column::<ProposalStatus>(&row.status)?,
            bkmd_reviewer_id: row.bkmd_reviewer_id,
            bkmd_reviewed_at: row.bkmd_reviewed_at,
            bkmd_comments: row.bkmd_comments,
            director_reviewer_id: row.director_reviewer_id,
            director_reviewed_at: row.director_reviewed_at,
            director_comments: row.director_comments,
            rc_meeting_id: row.rc_meeting_id,
            rc_comments: row.rc_comments,
            converted_project_id: row.converted_project_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    code: String,
    title: String,
    description: Option<String>,
    category: String,
    vertical_id: String,
    special_area_id: Option<String>,
    project_head_id: String,
    objectives: Option<String>,
    methodology: Option<String>,
    expected_outcome: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Project {
            id: row.id,
            code: row.code,
            title: row.title,
            description: row.description,
            category: parse_column::<ProjectCategory>(&row.category)?,
            vertical_id: row.vertical_id,
            special_area_id: row.special_area_id,
            project_head_id: row.project_head_id,
            objectives: row.objectives,
            methodology: row.methodology,
            expected_outcome: row.expected_outcome,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_column::<ProjectStatus>(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VerticalRow {
    id: String,
    code: String,
    name: String,
    description: Option<String>,
}

impl From<VerticalRow> for Vertical {
    fn from(row: VerticalRow) -> Self {
        Vertical {
            id: row.id,
            code: row.code,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SpecialAreaRow {
    id: String,
    name: String,
    description: Option<String>,
}

impl From<SpecialAreaRow> for SpecialArea {
    fn from(row: SpecialAreaRow) -> Self {
        SpecialArea {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

fn parse_column<T>(raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| StoreError::Backend(anyhow!("corrupt row: {}", e)))
}

fn rows_into<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn status_conflict(allowed: &[ProposalStatus], actual: ProposalStatus) -> StoreError {
    StoreError::StatusConflict {
        expected: allowed.to_vec(),
        actual,
    }
}

fn status_names(statuses: &[ProposalStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

// ============================================================================
// Store
// ============================================================================

/// Postgres-backed proposal store
#[derive(Clone)]
pub struct PgProposalStore {
    pool: PgPool,
}

impl PgProposalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from `config` and wrap it.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!("Database connection pool created successfully");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Insert reference rows that are not already present. Returns the number
    /// of rows inserted.
    pub async fn seed_taxonomy(
        &self,
        verticals: &[Vertical],
        special_areas: &[SpecialArea],
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for v in verticals {
            inserted += sqlx::query(
                r#"
                INSERT INTO verticals (id, code, name, description)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&v.id)
            .bind(&v.code)
            .bind(&v.name)
            .bind(&v.description)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for a in special_areas {
            inserted += sqlx::query(
                r#"
                INSERT INTO special_areas (id, name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&a.id)
            .bind(&a.name)
            .bind(&a.description)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn lock_proposal(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Proposal, StoreError> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE id = $1 FOR UPDATE",
            PROPOSAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound)?;
        Proposal::try_from(row)
    }

    async fn write_proposal(
        tx: &mut Transaction<'_, Postgres>,
        p: &Proposal,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE proposals SET
                title = $2, description = $3, category = $4, vertical_id = $5,
                special_area_id = $6, objectives = $7, methodology = $8,
                expected_outcome = $9, proposed_start_date = $10, proposed_end_date = $11,
                estimated_budget = $12, status = $13,
                bkmd_reviewer_id = $14, bkmd_reviewed_at = $15, bkmd_comments = $16,
                director_reviewer_id = $17, director_reviewed_at = $18, director_comments = $19,
                rc_meeting_id = $20, rc_comments = $21, converted_project_id = $22,
                updated_at = $23
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(p.category.as_str())
        .bind(&p.vertical_id)
        .bind(&p.special_area_id)
        .bind(&p.objectives)
        .bind(&p.methodology)
        .bind(&p.expected_outcome)
        .bind(p.proposed_start_date)
        .bind(p.proposed_end_date)
        .bind(p.estimated_budget)
        .bind(p.status.as_str())
        .bind(&p.bkmd_reviewer_id)
        .bind(p.bkmd_reviewed_at)
        .bind(&p.bkmd_comments)
        .bind(&p.director_reviewer_id)
        .bind(p.director_reviewed_at)
        .bind(&p.director_comments)
        .bind(&p.rc_meeting_id)
        .bind(&p.rc_comments)
        .bind(p.converted_project_id)
        .bind(p.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for PgProposalStore {
    async fn find_vertical(&self, id: &str) -> Result<Option<Vertical>, StoreError> {
        let row = sqlx::query_as::<_, VerticalRow>(
            "SELECT id, code, name, description FROM verticals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Vertical::from))
    }

    async fn find_special_area(&self, id: &str) -> Result<Option<SpecialArea>, StoreError> {
        let row = sqlx::query_as::<_, SpecialAreaRow>(
            "SELECT id, name, description FROM special_areas WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SpecialArea::from))
    }

    async fn list_verticals(&self) -> Result<Vec<Vertical>, StoreError> {
        let rows = sqlx::query_as::<_, VerticalRow>(
            "SELECT id, code, name, description FROM verticals ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Vertical::from).collect())
    }

    async fn list_special_areas(&self) -> Result<Vec<SpecialArea>, StoreError> {
        let rows = sqlx::query_as::<_, SpecialAreaRow>(
            "SELECT id, name, description FROM special_areas ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SpecialArea::from).collect())
    }

    async fn insert_proposal(&self, p: &Proposal) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO proposals ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(p.id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(p.category.as_str())
        .bind(&p.vertical_id)
        .bind(&p.special_area_id)
        .bind(&p.submitted_by_id)
        .bind(&p.objectives)
        .bind(&p.methodology)
        .bind(&p.expected_outcome)
        .bind(p.proposed_start_date)
        .bind(p.proposed_end_date)
        .bind(p.estimated_budget)
        .bind(p.status.as_str())
        .bind(&p.bkmd_reviewer_id)
        .bind(p.bkmd_reviewed_at)
        .bind(&p.bkmd_comments)
        .bind(&p.director_reviewer_id)
        .bind(p.director_reviewed_at)
        .bind(&p.director_comments)
        .bind(&p.rc_meeting_id)
        .bind(&p.rc_comments)
        .bind(p.converted_project_id)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE id = $1",
            PROPOSAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn list_proposals(&self, query: &ProposalQuery) -> Result<Vec<Proposal>, StoreError> {
        const NO_QUEUE: &[ProposalStatus] = &[];
        let (scope, user_id, queue) = match &query.scope {
            VisibilityScope::Unrestricted => ("all", "", NO_QUEUE),
            VisibilityScope::SubmittedBy(user_id) => ("submitter", user_id.as_str(), NO_QUEUE),
            VisibilityScope::QueueOrReviewed {
                statuses,
                slot,
                user_id,
            } => {
                let scope = match slot {
                    ReviewerSlot::Bkmd => "bkmd",
                    ReviewerSlot::Director => "director",
                };
                (scope, user_id.as_str(), *statuses)
            }
        };

        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            SELECT {} FROM proposals
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR category = $2)
              AND CASE $3::text
                    WHEN 'all' THEN TRUE
                    WHEN 'submitter' THEN submitted_by_id = $4
                    WHEN 'bkmd' THEN status = ANY($5::text[]) OR bkmd_reviewer_id = $4
                    WHEN 'director' THEN status = ANY($5::text[]) OR director_reviewer_id = $4
                    ELSE FALSE
                  END
            ORDER BY created_at DESC
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.category.map(|c| c.as_str()))
        .bind(scope)
        .bind(user_id)
        .bind(status_names(queue))
        .fetch_all(&self.pool)
        .await?;
        rows_into(rows)
    }

    async fn list_by_status(
        &self,
        statuses: &[ProposalStatus],
    ) -> Result<Vec<Proposal>, StoreError> {
        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE status = ANY($1::text[]) ORDER BY updated_at DESC",
            PROPOSAL_COLUMNS
        ))
        .bind(status_names(statuses))
        .fetch_all(&self.pool)
        .await?;
        rows_into(rows)
    }

    async fn update_draft(
        &self,
        id: Uuid,
        fields: &ProposalFields,
    ) -> Result<Proposal, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut proposal = Self::lock_proposal(&mut tx, id).await?;
        if proposal.status != ProposalStatus::Draft {
            return Err(status_conflict(&[ProposalStatus::Draft], proposal.status));
        }
        proposal.apply_fields(fields.clone());
        Self::write_proposal(&mut tx, &proposal).await?;
        tx.commit().await?;
        Ok(proposal)
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        allowed_from: &[ProposalStatus],
        change: &StatusChange,
    ) -> Result<Proposal, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut proposal = Self::lock_proposal(&mut tx, id).await?;
        if !allowed_from.contains(&proposal.status) {
            return Err(status_conflict(allowed_from, proposal.status));
        }
        change.apply(&mut proposal);
        Self::write_proposal(&mut tx, &proposal).await?;
        tx.commit().await?;
        Ok(proposal)
    }

    async fn delete_proposal(
        &self,
        id: Uuid,
        allowed_from: Option<&[ProposalStatus]>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let proposal = Self::lock_proposal(&mut tx, id).await?;
        if let Some(allowed) = allowed_from {
            if !allowed.contains(&proposal.status) {
                return Err(status_conflict(allowed, proposal.status));
            }
        }
        sqlx::query("DELETE FROM proposals WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn convert(
        &self,
        id: Uuid,
        draft: ProjectDraft,
        prefix: &CodePrefix,
    ) -> Result<(Proposal, Project), StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut proposal = Self::lock_proposal(&mut tx, id).await?;
        if proposal.status != ProposalStatus::RcApproved {
            return Err(status_conflict(&[ProposalStatus::RcApproved], proposal.status));
        }

        // Held until commit/rollback; serializes code assignment per prefix
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(prefix.as_str())
            .execute(&mut *tx)
            .await?;

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT code FROM projects WHERE code LIKE $1")
                .bind(prefix.like_pattern())
                .fetch_all(&mut *tx)
                .await?;
        let code = next_project_code(prefix, existing.iter().map(String::as_str));
        let project = draft.into_project(code);

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO projects ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
            PROJECT_COLUMNS
        ))
        .bind(project.id)
        .bind(&project.code)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.category.as_str())
        .bind(&project.vertical_id)
        .bind(&project.special_area_id)
        .bind(&project.project_head_id)
        .bind(&project.objectives)
        .bind(&project.methodology)
        .bind(&project.expected_outcome)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status.as_str())
        .bind(project.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::DuplicateCode(project.code));
            }
            Err(e) => return Err(e.into()),
        }

        proposal.status = ProposalStatus::Converted;
        proposal.converted_project_id = Some(project.id);
        proposal.updated_at = project.created_at;
        Self::write_proposal(&mut tx, &proposal).await?;

        tx.commit().await?;
        Ok((proposal, project))
    }

    async fn load_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Project::try_from).transpose()
    }
}

/// Mask sensitive information in database URL for logging
fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else {
        // Unparseable: keep only the ends
        let chars: Vec<char> = url.chars().collect();
        if chars.len() > 20 {
            let head: String = chars[..10].iter().collect();
            let tail: String = chars[chars.len() - 10..].iter().collect();
            format!("{}***{}", head, tail)
        } else {
            "***".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_database_url() {
        assert_eq!(
            mask_database_url("postgresql://portal:s3cret@db:5432/portal"),
            "postgresql://portal:***@db:5432/portal"
        );
        assert_eq!(
            mask_database_url("postgresql://localhost/portal"),
            "postgresql://localhost/portal"
        );
    }

    #[test]
    fn test_mask_database_url_ignores_at_in_query() {
        let url = "postgresql://localhost/portal?options=a@b";
        let masked = mask_database_url(url);
        assert!(!masked.contains("***"), "{}", masked);
        assert!(masked.contains("options=a@b"), "{}", masked);
    }

    #[test]
    fn test_mask_database_url_unparseable() {
        assert_eq!(mask_database_url("not a url"), "***");
        assert_eq!(
            mask_database_url("definitely not a database url"),
            "definitely***tabase url"
        );
    }

    #[test]
    fn test_corrupt_status_is_backend_error() {
        assert!(matches!(
            parse_column::<ProposalStatus>("PENDING"),
            Err(StoreError::Backend(_))
        ));
    }
}
