// src/db/search_repo.rs
//
// Um buscador por alvo sobre o Postgres. O predicado de escopo entra no WHERE
// via `push_sql`, o texto via ILIKE "contém".

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::page_offset, text::contains_pattern},
    models::{
        access::ModuleName,
        debtor::DebtorDirector,
        search::{EntityOption, ResultEnvelope, SearchTarget, SubModule},
    },
    services::{
        module_registry,
        name_match::NameQuery,
        scope_resolver::{EntityKind, ScopePredicate},
        search_service::{ModuleSearcher, SearchScopes},
    },
};

/// Máximo de resultados por módulo na busca global e no typeahead.
const SEARCH_LIMIT: i64 = 20;

#[derive(Debug, FromRow)]
struct HitRow {
    id: Uuid,
    title: String,
}

#[derive(Debug, FromRow)]
struct OptionRow {
    id: Uuid,
    fields: Json<Map<String, Value>>,
}

impl From<OptionRow> for EntityOption {
    fn from(row: OptionRow) -> Self {
        EntityOption {
            id: row.id,
            fields: row.fields.0,
        }
    }
}

// ---
// Descrição SQL de cada tabela buscável
// ---

struct TableSql {
    table: &'static str,
    alias: &'static str,
    kind: EntityKind,
    /// Expressão do título exibido
    title: &'static str,
    /// Colunas comparadas com o texto
    text_columns: &'static [&'static str],
    /// Expressão `jsonb_build_object(...)` com os campos de identificação
    fields: &'static str,
    order_by: &'static str,
}

/// Sub-entidade: o resultado aponta para o registro pai.
struct NestedSql {
    table: TableSql,
    parent_column: &'static str,
    module: ModuleName,
    sub: SubModule,
}

const USERS: TableSql = TableSql {
    table: "users",
    alias: "u",
    kind: EntityKind::User,
    title: "u.name",
    text_columns: &["name", "email"],
    fields: "jsonb_build_object('name', u.name, 'email', u.email)",
    order_by: "u.name ASC",
};

const CLIENTS: TableSql = TableSql {
    table: "clients",
    alias: "c",
    kind: EntityKind::Client,
    title: "c.name",
    text_columns: &["name", "abn", "acn"],
    fields: "jsonb_build_object('name', c.name, 'crmClientId', c.crm_client_id, 'abn', c.abn, 'acn', c.acn)",
    order_by: "c.name ASC",
};

const CLIENT_CONTACTS: NestedSql = NestedSql {
    table: TableSql {
        table: "client_users",
        alias: "cu",
        kind: EntityKind::ClientUser,
        title: "cu.name",
        text_columns: &["name", "email"],
        fields: "jsonb_build_object('name', cu.name, 'email', cu.email)",
        order_by: "cu.name ASC",
    },
    parent_column: "client_id",
    module: ModuleName::Client,
    sub: SubModule::Contacts,
};

const INSURERS: TableSql = TableSql {
    table: "insurers",
    alias: "i",
    kind: EntityKind::Insurer,
    title: "i.name",
    text_columns: &["name"],
    fields: "jsonb_build_object('name', i.name, 'crmInsurerId', i.crm_insurer_id)",
    order_by: "i.name ASC",
};

const INSURER_CONTACTS: NestedSql = NestedSql {
    table: TableSql {
        table: "insurer_users",
        alias: "iu",
        kind: EntityKind::InsurerUser,
        title: "iu.name",
        text_columns: &["name", "email"],
        fields: "jsonb_build_object('name', iu.name, 'email', iu.email)",
        order_by: "iu.name ASC",
    },
    parent_column: "insurer_id",
    module: ModuleName::Insurer,
    sub: SubModule::Contacts,
};

const DEBTORS: TableSql = TableSql {
    table: "debtors",
    alias: "d",
    kind: EntityKind::Debtor,
    title: "d.entity_name",
    text_columns: &["entity_name", "abn", "acn", "registration_number"],
    fields: "jsonb_build_object('entityName', d.entity_name, 'abn', d.abn, 'acn', d.acn, 'registrationNumber', d.registration_number)",
    order_by: "d.entity_name ASC",
};

const DIRECTORS: TableSql = TableSql {
    table: "debtor_directors",
    alias: "dd",
    kind: EntityKind::DebtorDirector,
    title: "COALESCE(dd.entity_name, '')",
    text_columns: &[],
    fields: "jsonb_build_object('debtorId', dd.debtor_id, 'firstName', dd.first_name, 'middleName', dd.middle_name, 'lastName', dd.last_name, 'entityName', dd.entity_name)",
    order_by: "dd.last_name ASC NULLS LAST, dd.entity_name ASC NULLS LAST",
};

const TASKS: TableSql = TableSql {
    table: "tasks",
    alias: "t",
    kind: EntityKind::Task,
    title: "t.description",
    text_columns: &["description"],
    fields: "jsonb_build_object('description', t.description, 'clientId', t.client_id, 'isCompleted', t.is_completed)",
    order_by: "t.created_at DESC",
};

const APPLICATIONS: TableSql = TableSql {
    table: "applications",
    alias: "a",
    kind: EntityKind::Application,
    title: "a.application_id",
    text_columns: &["application_id"],
    fields: "jsonb_build_object('applicationId', a.application_id, 'clientId', a.client_id, 'debtorId', a.debtor_id, 'status', a.status)",
    order_by: "a.created_at DESC",
};

fn table_for(target: SearchTarget) -> &'static TableSql {
    match target {
        SearchTarget::User => &USERS,
        SearchTarget::Client => &CLIENTS,
        SearchTarget::Insurer => &INSURERS,
        SearchTarget::Debtor => &DEBTORS,
        SearchTarget::DebtorDirector => &DIRECTORS,
        SearchTarget::Task => &TASKS,
        SearchTarget::Application => &APPLICATIONS,
    }
}

fn nested_for(target: SearchTarget) -> Option<&'static NestedSql> {
    match target {
        SearchTarget::Client => Some(&CLIENT_CONTACTS),
        SearchTarget::Insurer => Some(&INSURER_CONTACTS),
        _ => None,
    }
}

impl TableSql {
    /// `FROM <tabela> <alias> WHERE <não apagado> AND <escopo>`
    fn push_from<'a>(&self, qb: &mut QueryBuilder<'a, Postgres>, scope: &ScopePredicate) {
        qb.push(format!(
            " FROM {table} {alias} WHERE {alias}.is_deleted = false AND ",
            table = self.table,
            alias = self.alias
        ));
        scope.push_sql(qb, self.alias);
    }

    fn push_text_filter<'a>(&self, qb: &mut QueryBuilder<'a, Postgres>, term: &str) {
        if self.text_columns.is_empty() {
            return;
        }
        let pattern = contains_pattern(term);
        qb.push(" AND (");
        for (i, column) in self.text_columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(format!("{}.{} ILIKE ", self.alias, column));
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }

    fn push_page<'a>(&self, qb: &mut QueryBuilder<'a, Postgres>, limit: i64, offset: i64) {
        qb.push(format!(" ORDER BY {} LIMIT ", self.order_by));
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
    }
}

#[derive(Clone)]
pub struct PgModuleSearcher {
    pool: PgPool,
    target: SearchTarget,
}

impl PgModuleSearcher {
    pub fn new(pool: PgPool, target: SearchTarget) -> Self {
        Self { pool, target }
    }

    /// Um buscador para cada alvo, na ordem de enumeração.
    pub fn all(pool: &PgPool) -> Vec<Self> {
        SearchTarget::ALL
            .into_iter()
            .map(|target| Self::new(pool.clone(), target))
            .collect()
    }

    async fn hits(&self, sql: &TableSql, scope: &ScopePredicate, term: &str, parent: Option<&str>) -> Result<Vec<HitRow>, AppError> {
        if scope.is_deny() {
            return Ok(Vec::new());
        }
        let id_column = parent.unwrap_or("id");
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {alias}.{id_column} AS id, {title} AS title",
            alias = sql.alias,
            title = sql.title
        ));
        sql.push_from(&mut qb, scope);
        sql.push_text_filter(&mut qb, term);
        sql.push_page(&mut qb, SEARCH_LIMIT, 0);

        let rows = qb.build_query_as::<HitRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // Stakeholders: fase 1 no banco, fase 2 em memória
    async fn directors(&self, scope: &ScopePredicate, term: &str) -> Result<Vec<DebtorDirector>, AppError> {
        if scope.is_deny() {
            return Ok(Vec::new());
        }
        let query = NameQuery::parse(term);
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT dd.id, dd.debtor_id, dd.kind, dd.first_name, dd.middle_name, dd.last_name, \
             dd.entity_name, dd.abn, dd.acn, dd.registration_number",
        );
        DIRECTORS.push_from(&mut qb, scope);
        qb.push(" AND ");
        query.push_sql(&mut qb, DIRECTORS.alias);
        query.push_order(&mut qb, DIRECTORS.alias, DIRECTORS.order_by);
        qb.push(" LIMIT ");
        qb.push_bind(SEARCH_LIMIT);

        let candidates = qb.build_query_as::<DebtorDirector>().fetch_all(&self.pool).await?;
        Ok(query.refine(candidates))
    }
}

#[async_trait]
impl ModuleSearcher for PgModuleSearcher {
    fn target(&self) -> SearchTarget {
        self.target
    }

    async fn search(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<ResultEnvelope>, AppError> {
        let Some(module) = module_registry::module_of(self.target) else {
            return Ok(Vec::new());
        };

        if self.target == SearchTarget::DebtorDirector {
            let found = self.directors(scopes.get(EntityKind::DebtorDirector), term).await?;
            return Ok(found
                .into_iter()
                .map(|d| ResultEnvelope::nested(d.debtor_id, d.display_name(), module, SubModule::Stakeholder))
                .collect());
        }

        let sql = table_for(self.target);
        let mut results: Vec<ResultEnvelope> = self
            .hits(sql, scopes.get(sql.kind), term, None)
            .await?
            .into_iter()
            .map(|hit| ResultEnvelope::top_level(hit.id, hit.title, module))
            .collect();

        if let Some(nested) = nested_for(self.target) {
            let hits = self
                .hits(&nested.table, scopes.get(nested.table.kind), term, Some(nested.parent_column))
                .await?;
            results.extend(
                hits.into_iter()
                    .map(|hit| ResultEnvelope::nested(hit.id, hit.title, nested.module, nested.sub)),
            );
        }

        Ok(results)
    }

    async fn options(&self, scopes: &SearchScopes, term: &str) -> Result<Vec<EntityOption>, AppError> {
        if self.target == SearchTarget::DebtorDirector {
            let found = self.directors(scopes.get(EntityKind::DebtorDirector), term).await?;
            return Ok(found
                .into_iter()
                .map(|d| {
                    EntityOption::new(d.id)
                        .with("debtorId", d.debtor_id.to_string())
                        .with("firstName", d.first_name)
                        .with("middleName", d.middle_name)
                        .with("lastName", d.last_name)
                        .with("entityName", d.entity_name)
                })
                .collect());
        }

        let sql = table_for(self.target);
        let scope = scopes.get(sql.kind);
        if scope.is_deny() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}.id, {} AS fields",
            sql.alias, sql.fields
        ));
        sql.push_from(&mut qb, scope);
        sql.push_text_filter(&mut qb, term);
        sql.push_page(&mut qb, SEARCH_LIMIT, 0);

        let rows = qb.build_query_as::<OptionRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EntityOption::from).collect())
    }

    async fn list_options(
        &self,
        scopes: &SearchScopes,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<EntityOption>, i64), AppError> {
        let sql = table_for(self.target);
        let scope = scopes.get(sql.kind);
        if scope.is_deny() {
            return Ok((Vec::new(), 0));
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        sql.push_from(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}.id, {} AS fields",
            sql.alias, sql.fields
        ));
        sql.push_from(&mut qb, scope);
        sql.push_page(&mut qb, limit, page_offset(page, limit));

        let rows = qb.build_query_as::<OptionRow>().fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(EntityOption::from).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_text_query_shape() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT c.id");
        CLIENTS.push_from(&mut qb, &ScopePredicate::IdIn(vec![Uuid::new_v4()]));
        CLIENTS.push_text_filter(&mut qb, "acme");
        CLIENTS.push_page(&mut qb, 20, 0);
        assert_eq!(
            qb.sql(),
            "SELECT c.id FROM clients c WHERE c.is_deleted = false AND c.id = ANY($1) \
             AND (c.name ILIKE $2 OR c.abn ILIKE $3 OR c.acn ILIKE $4) \
             ORDER BY c.name ASC LIMIT $5 OFFSET $6"
        );
    }

    #[test]
    fn every_target_has_a_table() {
        for target in SearchTarget::ALL {
            let sql = table_for(target);
            assert!(sql.fields.starts_with("jsonb_build_object("));
            assert!(sql.title.contains(sql.alias));
        }
        assert_eq!(nested_for(SearchTarget::Client).map(|n| n.sub), Some(SubModule::Contacts));
        assert!(nested_for(SearchTarget::Debtor).is_none());
    }
}
