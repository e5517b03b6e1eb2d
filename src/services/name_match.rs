// src/services/name_match.rs
//
// Busca de sócios/diretores ("stakeholders") em duas fases:
// 1. filtro largo no banco (ILIKE posicional por token OU string inteira nos campos de empresa)
// 2. pós-filtro exato sobre os componentes do nome, só para consultas de 2 ou 3 tokens

use sqlx::{Postgres, QueryBuilder};

use crate::{
    common::text::{contains_ignore_case, contains_pattern, eq_ignore_case},
    models::debtor::DebtorDirector,
};

const ENTITY_FIELDS: [&str; 4] = ["entity_name", "abn", "acn", "registration_number"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameQuery {
    /// Um token (ou mais de três): substring em qualquer campo, sem pós-filtro.
    Broad(String),
    /// Dois tokens = nome + sobrenome; três = nome + nome do meio + sobrenome.
    Positional { full: String, tokens: Vec<String> },
}

impl NameQuery {
    pub fn parse(term: &str) -> Self {
        let full = term.trim().to_string();
        let tokens: Vec<String> = full.split_whitespace().map(str::to_string).collect();
        match tokens.len() {
            2 | 3 => NameQuery::Positional { full, tokens },
            _ => NameQuery::Broad(full),
        }
    }

    fn name_columns(tokens: &[String]) -> &'static [&'static str] {
        if tokens.len() == 2 {
            &["first_name", "last_name"]
        } else {
            &["first_name", "middle_name", "last_name"]
        }
    }

    /// Fase 1: condição (sem `WHERE`) sobre a tabela `debtor_directors` com o alias dado.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        qb.push("(");
        match self {
            NameQuery::Broad(term) => {
                let pattern = contains_pattern(term);
                let columns = ["first_name", "middle_name", "last_name"]
                    .into_iter()
                    .chain(ENTITY_FIELDS);
                for (i, column) in columns.enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(format!("{alias}.{column} ILIKE "));
                    qb.push_bind(pattern.clone());
                }
            }
            NameQuery::Positional { full, tokens } => {
                qb.push("(");
                for (i, (column, token)) in Self::name_columns(tokens).iter().zip(tokens).enumerate() {
                    if i > 0 {
                        qb.push(" AND ");
                    }
                    qb.push(format!("{alias}.{column} ILIKE "));
                    qb.push_bind(contains_pattern(token));
                }
                qb.push(")");
                let pattern = contains_pattern(full);
                for column in ENTITY_FIELDS {
                    qb.push(format!(" OR {alias}.{column} ILIKE "));
                    qb.push_bind(pattern.clone());
                }
            }
        }
        qb.push(")");
    }

    /// `ORDER BY` da fase 1. Nas consultas posicionais, quem passa na fase 2
    /// vem antes, então o `LIMIT` nunca descarta um casamento exato.
    pub fn push_order(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str, tie_break: &str) {
        let NameQuery::Positional { full, tokens } = self else {
            qb.push(format!(" ORDER BY {tie_break}"));
            return;
        };

        qb.push(" ORDER BY ((");
        for (i, (column, token)) in Self::name_columns(tokens).iter().zip(tokens).enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            qb.push(format!("lower(btrim({alias}.{column})) = lower("));
            qb.push_bind(token.clone());
            qb.push(")");
        }
        qb.push(")");
        let pattern = contains_pattern(full);
        for column in ENTITY_FIELDS {
            qb.push(format!(" OR {alias}.{column} ILIKE "));
            qb.push_bind(pattern.clone());
        }
        qb.push(format!(") DESC, {tie_break}"));
    }

    /// Fase 2: igualdade exata dos componentes do nome OU casamento de empresa.
    pub fn exact_match(&self, director: &DebtorDirector) -> bool {
        match self {
            NameQuery::Broad(_) => true,
            NameQuery::Positional { full, tokens } => {
                let names = director.name_parts(tokens.len());
                let exact_name = names.iter().zip(tokens).all(|(field, token)| {
                    field.as_deref().is_some_and(|v| eq_ignore_case(v, token))
                });
                let entity_hit = [
                    &director.entity_name,
                    &director.abn,
                    &director.acn,
                    &director.registration_number,
                ]
                .into_iter()
                .any(|field| field.as_deref().is_some_and(|v| contains_ignore_case(v, full)));
                exact_name || entity_hit
            }
        }
    }

    /// Aplica a fase 2 sobre o resultado da fase 1.
    pub fn refine(&self, candidates: Vec<DebtorDirector>) -> Vec<DebtorDirector> {
        candidates.into_iter().filter(|d| self.exact_match(d)).collect()
    }
}

impl DebtorDirector {
    fn name_parts(&self, token_count: usize) -> Vec<&Option<String>> {
        if token_count == 2 {
            vec![&self.first_name, &self.last_name]
        } else {
            vec![&self.first_name, &self.middle_name, &self.last_name]
        }
    }
}
