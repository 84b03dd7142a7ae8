//! SQL dialects.
//!
//! A [`Dialect`] knows how one database family quotes identifiers and how it
//! spells an array literal. Dialects are plain `Copy` values with no state.

use std::fmt;
use std::str::FromStr;

use quill_core::{QuillError, QuillResult};

/// The database families quill can generate SQL for.
///
/// # Examples
///
/// ```
/// use quill_db::dialect::Dialect;
///
/// let dialect = Dialect::from_product_name("Microsoft SQL Server").unwrap();
/// assert_eq!(dialect.escape("a]b"), "[a]]b]");
/// assert_eq!(Dialect::Sql99.escape("users"), "\"users\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Generic SQL99. Used for `SQLite` and Oracle as well.
    #[default]
    Sql99,
    /// `MySQL`.
    MySql,
    /// `PostgreSQL`.
    PostgreSql,
    /// IBM DB2.
    Db2,
    /// Microsoft SQL Server.
    MsSqlServer,
}

impl Dialect {
    /// Picks the dialect for a database product name as reported by the
    /// driver. Matching is case-exact.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::UnknownDatabase`] for unrecognized names.
    pub fn from_product_name(name: &str) -> QuillResult<Self> {
        match name {
            "MySQL" => Ok(Self::MySql),
            "PostgreSQL" => Ok(Self::PostgreSql),
            "Microsoft SQL Server" => Ok(Self::MsSqlServer),
            "SQLite" | "Oracle" => Ok(Self::Sql99),
            _ if name.starts_with("DB2/") => Ok(Self::Db2),
            _ => Err(QuillError::UnknownDatabase(name.to_string())),
        }
    }

    /// Human readable name, used in log output and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sql99 => "SQL99",
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
            Self::Db2 => "DB2",
            Self::MsSqlServer => "Microsoft SQL Server",
        }
    }

    /// Returns `true` if this dialect can render array literals.
    pub const fn supports_arrays(self) -> bool {
        matches!(self, Self::Db2 | Self::PostgreSql)
    }

    /// Appends `name` to `out` as a quoted identifier.
    ///
    /// The closing delimiter is doubled wherever it occurs inside `name`.
    pub fn escape_identifier(self, name: &str, out: &mut String) {
        let (open, close) = match self {
            Self::MsSqlServer => ('[', ']'),
            Self::Sql99 | Self::MySql | Self::PostgreSql | Self::Db2 => ('"', '"'),
        };
        out.reserve(name.len() + 2);
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }

    /// Returns `name` as a quoted identifier.
    pub fn escape(self, name: &str) -> String {
        let mut out = String::new();
        self.escape_identifier(name, &mut out);
        out
    }

    /// Appends an array literal with `len` placeholders to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::UnsupportedOperation`] if the dialect has no
    /// array literal syntax. Nothing is written in that case.
    pub fn array_literal(self, len: usize, out: &mut String) -> QuillResult<()> {
        if !self.supports_arrays() {
            return Err(QuillError::UnsupportedOperation(format!(
                "arrays are not supported by {}",
                self.name()
            )));
        }
        out.push_str("ARRAY[");
        push_placeholders(len, out);
        out.push(']');
        Ok(())
    }
}

/// Appends `len` comma-separated `?` placeholders.
pub(crate) fn push_placeholders(len: usize, out: &mut String) {
    for i in 0..len {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('?');
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = QuillError;

    /// Accepts product names as well as the dialect names returned by
    /// [`Dialect::name`], so a configured dialect round-trips.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQL99" => Ok(Self::Sql99),
            "DB2" => Ok(Self::Db2),
            _ => Self::from_product_name(s),
        }
    }
}
