//! Postgres-backed record store.
//!
//! Rows are mapped by hand (`try_get`) so the domain crate stays free of
//! sqlx. Dynamic list filters are built with `QueryBuilder`; the SQL must
//! agree with the in-process `matches()` semantics in `store`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

use guichet_core::{
    Commentaire, CommentaireId, Demande, DemandeId, DemandeStatus, DomainError, DomainResult,
    Role, User, UserId,
};

use crate::store::{
    CommentaireFilter, CommentaireScope, DemandeFilter, DemandeScope, RecordStore, SortOrder,
    UserFilter,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPool::connect(database_url).await.map_err(db_err)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::storage(e.to_string())
}

/// Unique-index races on email surface as a conflict, not a storage error.
fn insert_err(e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DomainError::conflict("email already registered");
        }
    }
    db_err(e)
}

fn user_from_row(row: &PgRow) -> DomainResult<User> {
    let role: String = row.try_get("role").map_err(db_err)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(db_err)?),
        name: row.try_get("name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        role: role.parse::<Role>()?,
        active: row.try_get("active").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
    })
}

fn demande_from_row(row: &PgRow) -> DomainResult<Demande> {
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Demande {
        id: DemandeId::from_uuid(row.try_get("id").map_err(db_err)?),
        title: row.try_get("title").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        status: status.parse::<DemandeStatus>()?,
        created_by: UserId::from_uuid(row.try_get("created_by").map_err(db_err)?),
        assigned_agent: row
            .try_get::<Option<Uuid>, _>("assigned_agent")
            .map_err(db_err)?
            .map(UserId::from_uuid),
        assigned_at: row.try_get("assigned_at").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
        updated_by: row
            .try_get::<Option<Uuid>, _>("updated_by")
            .map_err(db_err)?
            .map(UserId::from_uuid),
        deleted_at: row.try_get("deleted_at").map_err(db_err)?,
        deleted_by: row
            .try_get::<Option<Uuid>, _>("deleted_by")
            .map_err(db_err)?
            .map(UserId::from_uuid),
    })
}

fn commentaire_from_row(row: &PgRow) -> DomainResult<Commentaire> {
    Ok(Commentaire {
        id: CommentaireId::from_uuid(row.try_get("id").map_err(db_err)?),
        demande_id: DemandeId::from_uuid(row.try_get("demande_id").map_err(db_err)?),
        author: UserId::from_uuid(row.try_get("author").map_err(db_err)?),
        content: row.try_get("content").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        deleted_at: row.try_get("deleted_at").map_err(db_err)?,
        deleted_by: row
            .try_get::<Option<Uuid>, _>("deleted_by")
            .map_err(db_err)?
            .map(UserId::from_uuid),
    })
}

const DEMANDE_COLS: &str = "id, title, description, status, created_by, assigned_agent, \
     assigned_at, created_at, updated_at, updated_by, deleted_at, deleted_by";

const COMMENTAIRE_COLS: &str = "id, demande_id, author, content, created_at, deleted_at, deleted_by";

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, active, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, role, active, password_hash FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, role, active, password_hash FROM users \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, role = $4, active = $5, password_hash = $6 \
             WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> DomainResult<Vec<User>> {
        let mut qb = QueryBuilder::new(
            "SELECT id, name, email, role, active, password_hash FROM users WHERE TRUE",
        );
        if let Some(active) = filter.active {
            qb.push(" AND active = ").push_bind(active);
        }
        if let Some(fragment) = &filter.email_contains {
            // Plain substring match: position() keeps %/_ literal, unlike ILIKE.
            qb.push(" AND position(lower(")
                .push_bind(fragment)
                .push(") in lower(email)) > 0");
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role.as_str());
        }
        qb.push(" ORDER BY email ASC");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_demande(&self, demande: &Demande) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO demandes (id, title, description, status, created_by, assigned_agent, \
             assigned_at, created_at, updated_at, updated_by, deleted_at, deleted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(demande.id.as_uuid())
        .bind(&demande.title)
        .bind(&demande.description)
        .bind(demande.status.as_str())
        .bind(demande.created_by.as_uuid())
        .bind(demande.assigned_agent.map(Uuid::from))
        .bind(demande.assigned_at)
        .bind(demande.created_at)
        .bind(demande.updated_at)
        .bind(demande.updated_by.map(Uuid::from))
        .bind(demande.deleted_at)
        .bind(demande.deleted_by.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_demande(&self, id: DemandeId) -> DomainResult<Option<Demande>> {
        // Deliberately no deleted_at filter: precondition checks need the
        // deleted row to answer NotFound consistently.
        let row = sqlx::query(&format!("SELECT {DEMANDE_COLS} FROM demandes WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(demande_from_row).transpose()
    }

    async fn update_demande(&self, demande: &Demande) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE demandes SET title = $2, description = $3, status = $4, assigned_agent = $5, \
             assigned_at = $6, updated_at = $7, updated_by = $8, deleted_at = $9, deleted_by = $10 \
             WHERE id = $1",
        )
        .bind(demande.id.as_uuid())
        .bind(&demande.title)
        .bind(&demande.description)
        .bind(demande.status.as_str())
        .bind(demande.assigned_agent.map(Uuid::from))
        .bind(demande.assigned_at)
        .bind(demande.updated_at)
        .bind(demande.updated_by.map(Uuid::from))
        .bind(demande.deleted_at)
        .bind(demande.deleted_by.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn list_demandes(&self, filter: &DemandeFilter) -> DomainResult<Vec<Demande>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {DEMANDE_COLS} FROM demandes WHERE deleted_at IS NULL"
        ));
        if let DemandeScope::CreatedBy(creator) = filter.scope {
            qb.push(" AND created_by = ").push_bind(Uuid::from(creator));
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(agent) = filter.assigned_agent {
            // Explicit agent filter wins over the assigned/unassigned flag.
            qb.push(" AND assigned_agent = ").push_bind(Uuid::from(agent));
        } else if let Some(assigned) = filter.assigned {
            qb.push(if assigned {
                " AND assigned_agent IS NOT NULL"
            } else {
                " AND assigned_agent IS NULL"
            });
        }
        if let Some(day) = filter.created_on {
            qb.push(" AND (created_at AT TIME ZONE 'UTC')::date = ").push_bind(day);
        }
        qb.push(match filter.order {
            SortOrder::Asc => " ORDER BY created_at ASC",
            SortOrder::Desc => " ORDER BY created_at DESC",
        });

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(demande_from_row).collect()
    }

    async fn insert_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO commentaires (id, demande_id, author, content, created_at, deleted_at, deleted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(commentaire.id.as_uuid())
        .bind(commentaire.demande_id.as_uuid())
        .bind(commentaire.author.as_uuid())
        .bind(&commentaire.content)
        .bind(commentaire.created_at)
        .bind(commentaire.deleted_at)
        .bind(commentaire.deleted_by.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_commentaire(&self, id: CommentaireId) -> DomainResult<Option<Commentaire>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENTAIRE_COLS} FROM commentaires WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(commentaire_from_row).transpose()
    }

    async fn update_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE commentaires SET content = $2, deleted_at = $3, deleted_by = $4 WHERE id = $1",
        )
        .bind(commentaire.id.as_uuid())
        .bind(&commentaire.content)
        .bind(commentaire.deleted_at)
        .bind(commentaire.deleted_by.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn list_commentaires(&self, filter: &CommentaireFilter) -> DomainResult<Vec<Commentaire>> {
        // The join scopes by the parent's creator but does NOT exclude
        // deleted parents: comments on deleted tickets stay listed.
        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.demande_id, c.author, c.content, c.created_at, c.deleted_at, c.deleted_by \
             FROM commentaires c JOIN demandes d ON d.id = c.demande_id \
             WHERE c.deleted_at IS NULL",
        );
        if let CommentaireScope::ParentCreatedBy(creator) = filter.scope {
            qb.push(" AND d.created_by = ").push_bind(Uuid::from(creator));
        }
        if let Some(demande) = filter.demande {
            qb.push(" AND c.demande_id = ").push_bind(Uuid::from(demande));
        }
        qb.push(" ORDER BY c.created_at DESC");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(commentaire_from_row).collect()
    }
}
