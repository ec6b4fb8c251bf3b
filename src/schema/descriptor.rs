//! The one supported table shape.
//!
//! Every column is paired with the accessor that produces its value from a
//! [`Fingerprint`], so the DDL, the verifier and the insert all walk the same
//! static array and cannot drift apart.

use serde::Serialize;
use std::fmt;

use crate::fingerprint::Fingerprint;

/// Number of columns in the fingerprint table.
pub const COLUMN_COUNT: usize = 33;

/// Logical column types understood by the analytics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Int64,
    UInt16,
    ArrayOfString,
}

impl ColumnType {
    /// Type name as the store spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Int64 => "Int64",
            ColumnType::UInt16 => "UInt16",
            ColumnType::ArrayOfString => "Array(String)",
        }
    }

    /// Case-insensitive comparison against a type name reported by the store.
    pub fn matches(&self, actual: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(actual.trim())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column value borrowed from a fingerprint.
///
/// Serializes to the plain JSON shape the store expects for the column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue<'a> {
    String(&'a str),
    Int64(i64),
    UInt16(u16),
    ArrayOfString(&'a [String]),
}

impl ColumnValue<'_> {
    /// The column type this value belongs to.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValue::String(_) => ColumnType::String,
            ColumnValue::Int64(_) => ColumnType::Int64,
            ColumnValue::UInt16(_) => ColumnType::UInt16,
            ColumnValue::ArrayOfString(_) => ColumnType::ArrayOfString,
        }
    }
}

/// Column declaration plus its value accessor.
#[derive(Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub value: for<'a> fn(&'a Fingerprint) -> ColumnValue<'a>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

macro_rules! string_column {
    ($field:ident) => {
        Column {
            name: stringify!($field),
            ty: ColumnType::String,
            value: |fp| ColumnValue::String(&fp.$field),
        }
    };
}

/// Table layout in insert order.
pub static COLUMNS: [Column; COLUMN_COUNT] = [
    string_column!(user_agent),
    string_column!(ip_address),
    string_column!(accept_language),
    string_column!(accept_encoding),
    string_column!(accept_charset),
    string_column!(accept),
    string_column!(connection),
    string_column!(host),
    string_column!(x_forwarded_for),
    string_column!(referer),
    string_column!(cookie),
    string_column!(dnt),
    string_column!(upgrade_insecure_requests),
    string_column!(cache_control),
    string_column!(pragma),
    string_column!(via),
    string_column!(forwarded),
    string_column!(x_real_ip),
    string_column!(x_forwarded_proto),
    string_column!(x_forwarded_host),
    string_column!(x_forwarded_port),
    string_column!(x_amz_date),
    string_column!(x_api_key),
    string_column!(x_request_id),
    string_column!(authorization),
    string_column!(content_type),
    Column {
        name: "content_length",
        ty: ColumnType::Int64,
        value: |fp| ColumnValue::Int64(fp.content_length),
    },
    string_column!(method),
    string_column!(request_uri),
    string_column!(protocol),
    Column {
        name: "transfer_encoding",
        ty: ColumnType::ArrayOfString,
        value: |fp| ColumnValue::ArrayOfString(&fp.transfer_encoding),
    },
    Column {
        name: "tls_version",
        ty: ColumnType::UInt16,
        value: |fp| ColumnValue::UInt16(fp.tls_version),
    },
    Column {
        name: "tls_cipher_suite",
        ty: ColumnType::UInt16,
        value: |fp| ColumnValue::UInt16(fp.tls_cipher_suite),
    },
];

/// Column names used as the table's ordering key.
pub const ORDER_BY: [&str; 2] = ["user_agent", "ip_address"];

/// One named value of an insert row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'a> {
    pub column: &'static str,
    pub value: ColumnValue<'a>,
}

/// Build the insert row for a fingerprint, in [`COLUMNS`] order.
pub fn row(fingerprint: &Fingerprint) -> Vec<Cell<'_>> {
    COLUMNS
        .iter()
        .map(|column| Cell {
            column: column.name,
            value: (column.value)(fingerprint),
        })
        .collect()
}
