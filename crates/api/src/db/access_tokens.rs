//! Access token query builders.

use sea_query::{Cond, Expr, Func, Query, SimpleExpr, SqliteQueryBuilder};
use tallyback_core::{CustomerAction, Id, TokenKind};

use super::tables::AccessTokens;
use super::Built;

/// Column order read back by row mappers.
pub fn columns() -> [AccessTokens; 13] {
    [
        AccessTokens::Id,
        AccessTokens::Token,
        AccessTokens::Kind,
        AccessTokens::SubjectId,
        AccessTokens::BatchId,
        AccessTokens::CreatedAt,
        AccessTokens::ExpiresAt,
        AccessTokens::FirstOpenedAt,
        AccessTokens::LastOpenedAt,
        AccessTokens::OpenCount,
        AccessTokens::CustomerAction,
        AccessTokens::CustomerActionAt,
        AccessTokens::CustomerNotes,
    ]
}

/// INSERT a freshly issued token.
pub fn insert(
    token: &str,
    kind: TokenKind,
    subject_id: Id,
    batch_id: Option<&str>,
    created_at: &str,
    expires_at: Option<&str>,
) -> Built {
    Query::insert()
        .into_table(AccessTokens::Table)
        .columns([
            AccessTokens::Token,
            AccessTokens::Kind,
            AccessTokens::SubjectId,
            AccessTokens::BatchId,
            AccessTokens::CreatedAt,
            AccessTokens::ExpiresAt,
        ])
        .values_panic([
            token.into(),
            kind.as_str().into(),
            subject_id.into(),
            batch_id.map(str::to_string).into(),
            created_at.into(),
            expires_at.map(str::to_string).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Lookup by exact token match.
pub fn lookup(token: &str) -> Built {
    Query::select()
        .columns(columns())
        .from(AccessTokens::Table)
        .and_where(Expr::col(AccessTokens::Token).eq(token))
        .build(SqliteQueryBuilder)
}

/// Record one open in a single statement: keep the first open, bump the rest.
pub fn record_visit(token: &str, now: &str) -> Built {
    Query::update()
        .table(AccessTokens::Table)
        .value(
            AccessTokens::FirstOpenedAt,
            Func::coalesce([
                SimpleExpr::from(Expr::col(AccessTokens::FirstOpenedAt)),
                Expr::val(now).into(),
            ]),
        )
        .value(AccessTokens::LastOpenedAt, now)
        .value(
            AccessTokens::OpenCount,
            Expr::col(AccessTokens::OpenCount).add(1),
        )
        .and_where(Expr::col(AccessTokens::Token).eq(token))
        .build(SqliteQueryBuilder)
}

/// Write the customer decision only if none is recorded and the window is
/// still open at `acted_at`. Zero affected rows means the guard tripped.
///
/// Expiry is compared as an instant: issuers may store any RFC 3339 offset,
/// which does not order correctly as text.
pub fn record_outcome(
    token: &str,
    action: CustomerAction,
    acted_at: &str,
    notes: Option<&str>,
) -> Built {
    Query::update()
        .table(AccessTokens::Table)
        .value(AccessTokens::CustomerAction, action.as_str())
        .value(AccessTokens::CustomerActionAt, acted_at)
        .value(AccessTokens::CustomerNotes, notes.map(str::to_string))
        .cond_where(
            Cond::all()
                .add(Expr::col(AccessTokens::Token).eq(token))
                .add(Expr::col(AccessTokens::Kind).eq(TokenKind::Review.as_str()))
                .add(Expr::col(AccessTokens::CustomerAction).is_null())
                .add(
                    Cond::any()
                        .add(Expr::col(AccessTokens::ExpiresAt).is_null())
                        .add(Expr::cust_with_values(
                            r#"julianday("expires_at") > julianday(?)"#,
                            [acted_at],
                        )),
                ),
        )
        .build(SqliteQueryBuilder)
}
