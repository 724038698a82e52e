//! Customer query builders.

use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use tallyback_core::Id;

use super::tables::Customers;
use super::Built;

pub fn columns() -> [Customers; 3] {
    [Customers::Id, Customers::Name, Customers::Email]
}

/// INSERT or refresh a customer mirrored from the accounting system.
pub fn upsert(id: Id, name: &str, email: Option<&str>) -> Built {
    Query::insert()
        .into_table(Customers::Table)
        .columns(columns())
        .values_panic([id.into(), name.into(), email.map(str::to_string).into()])
        .on_conflict(
            OnConflict::column(Customers::Id)
                .update_columns([Customers::Name, Customers::Email])
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

pub fn lookup(id: Id) -> Built {
    Query::select()
        .columns(columns())
        .from(Customers::Table)
        .and_where(Expr::col(Customers::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Customers by id, ascending.
pub fn list_by_ids(ids: &[Id]) -> Built {
    Query::select()
        .columns(columns())
        .from(Customers::Table)
        .and_where(Expr::col(Customers::Id).is_in(ids.iter().copied()))
        .order_by(Customers::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}
