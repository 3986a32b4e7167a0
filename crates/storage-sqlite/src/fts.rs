//! Helpers for the FTS4 shadow tables.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;

use crate::errors::StorageError;

/// Turns free user input into an FTS4 match expression: every token becomes a
/// lowercase prefix term, all terms required. Characters FTS treats as syntax
/// are dropped. `None` when nothing searchable is left.
pub fn sanitize_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .map(|token| format!("{token}*"))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

#[derive(QueryableByName)]
struct MatchedId {
    #[diesel(sql_type = Text)]
    id: String,
}

#[derive(QueryableByName)]
struct RowId {
    #[diesel(sql_type = BigInt)]
    rowid: i64,
}

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// A shadow table and the column holding its resource id.
///
/// Shadow rows are stored under `docid` = the resource row's `rowid`, so
/// replacing or deleting one is a key lookup rather than a scan.
#[derive(Debug, Clone, Copy)]
pub struct FtsTable {
    pub name: &'static str,
    pub id_column: &'static str,
    pub source_table: &'static str,
}

pub const NEWS_FTS: FtsTable = FtsTable {
    name: "newsResourcesFts",
    id_column: "news_resource_id",
    source_table: "news_resources",
};

pub const TRANSFER_FTS: FtsTable = FtsTable {
    name: "transferResourcesFts",
    id_column: "transfer_resource_id",
    source_table: "transfer_resources",
};

impl FtsTable {
    pub fn search_ids(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
    ) -> Result<Vec<String>, StorageError> {
        let Some(expression) = sanitize_match_query(query) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT DISTINCT {id} AS id FROM {table} WHERE {table} MATCH ?",
            id = self.id_column,
            table = self.name
        );
        let rows = diesel::sql_query(sql)
            .bind::<Text, _>(expression)
            .load::<MatchedId>(conn)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    pub fn count(&self, conn: &mut SqliteConnection) -> Result<i64, StorageError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", self.name);
        Ok(diesel::sql_query(sql).get_result::<RowCount>(conn)?.count)
    }

    /// `rowid` of the resource row `id`, if it exists.
    pub fn docid(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<i64>, StorageError> {
        let sql = format!("SELECT rowid FROM {} WHERE id = ?", self.source_table);
        let row = diesel::sql_query(sql)
            .bind::<Text, _>(id)
            .get_result::<RowId>(conn)
            .optional()?;
        Ok(row.map(|row| row.rowid))
    }

    pub fn delete_docid(
        &self,
        conn: &mut SqliteConnection,
        docid: i64,
    ) -> Result<usize, StorageError> {
        let sql = format!("DELETE FROM {} WHERE docid = ?", self.name);
        Ok(diesel::sql_query(sql).bind::<BigInt, _>(docid).execute(conn)?)
    }

    /// Removes the shadow row of `id`. Must run before the resource row is
    /// deleted.
    pub fn delete(&self, conn: &mut SqliteConnection, id: &str) -> Result<usize, StorageError> {
        match self.docid(conn, id)? {
            Some(docid) => self.delete_docid(conn, docid),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_become_required_prefixes() {
        assert_eq!(
            sanitize_match_query("  Derby   day "),
            Some("derby* day*".to_string())
        );
    }

    #[test]
    fn fts_syntax_is_stripped() {
        assert_eq!(
            sanitize_match_query("\"Real\" OR -Madrid*"),
            Some("real* or* madrid*".to_string())
        );
        assert_eq!(sanitize_match_query("\"\" * -"), None);
        assert_eq!(sanitize_match_query("   "), None);
    }
}
