use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use scylla::value::CqlValue;
use serde::{Deserialize, Serialize};

use crate::db::delivery_tables::DeliveryTable;

/// Status value that marks a delivery as completed
pub const DELIVERED_STATUS: &str = "Delivered";

/// One humanitarian delivery as projected from the `humanitarian_deliveries` table.
///
/// Field order matches the projection query, so CSV headers written through
/// serde come out in the same order as the query columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub branch: String,
    pub route: String,
    pub delivery_id: String,
    #[serde(with = "date_format")]
    pub arrival_date: NaiveDateTime,
    pub beneficiaries_count: i64,
    pub capacity_utilisation: f64,
    pub cargo_subtype: String,
    pub cargo_type: String,
    #[serde(with = "date_format")]
    pub created_date: NaiveDateTime,
    pub day_of_week: String,
    pub distribution_center: String,
    pub driver_name: String,
    pub region: String,
    pub released_tonnes: f64,
    pub requested_tonnes: f64,
    pub return_percentage: f64,
    pub status: String,
    pub urgency_level: String,
    pub vehicle: String,
    pub vehicle_load_tonnes: f64,
    pub warehouse_release_time_hours: f64,
    pub week_range: String,
}

impl DeliveryRecord {
    /// Convert a raw CQL row, in projection order, into a typed record.
    pub fn from_row(row: &[Option<CqlValue>]) -> Result<Self, RowError> {
        if row.len() != DeliveryTable::COLUMNS.len() {
            return Err(RowError::ColumnCount {
                expected: DeliveryTable::COLUMNS.len(),
                found: row.len(),
            });
        }

        Ok(Self {
            branch: text(DeliveryTable::COLUMN_BRANCH, &row[0])?,
            route: text(DeliveryTable::COLUMN_ROUTE, &row[1])?,
            delivery_id: identifier(DeliveryTable::COLUMN_DELIVERY_ID, &row[2])?,
            arrival_date: date(DeliveryTable::COLUMN_ARRIVAL_DATE, &row[3])?,
            beneficiaries_count: integer(DeliveryTable::COLUMN_BENEFICIARIES_COUNT, &row[4])?,
            capacity_utilisation: real(DeliveryTable::COLUMN_CAPACITY_UTILISATION, &row[5])?,
            cargo_subtype: text(DeliveryTable::COLUMN_CARGO_SUBTYPE, &row[6])?,
            cargo_type: text(DeliveryTable::COLUMN_CARGO_TYPE, &row[7])?,
            created_date: date(DeliveryTable::COLUMN_CREATED_DATE, &row[8])?,
            day_of_week: text(DeliveryTable::COLUMN_DAY_OF_WEEK, &row[9])?,
            distribution_center: text(DeliveryTable::COLUMN_DISTRIBUTION_CENTER, &row[10])?,
            driver_name: text(DeliveryTable::COLUMN_DRIVER_NAME, &row[11])?,
            region: text(DeliveryTable::COLUMN_REGION, &row[12])?,
            released_tonnes: real(DeliveryTable::COLUMN_RELEASED_TONNES, &row[13])?,
            requested_tonnes: real(DeliveryTable::COLUMN_REQUESTED_TONNES, &row[14])?,
            return_percentage: real(DeliveryTable::COLUMN_RETURN_PERCENTAGE, &row[15])?,
            status: text(DeliveryTable::COLUMN_STATUS, &row[16])?,
            urgency_level: text(DeliveryTable::COLUMN_URGENCY_LEVEL, &row[17])?,
            vehicle: text(DeliveryTable::COLUMN_VEHICLE, &row[18])?,
            vehicle_load_tonnes: real(DeliveryTable::COLUMN_VEHICLE_LOAD_TONNES, &row[19])?,
            warehouse_release_time_hours: real(
                DeliveryTable::COLUMN_WAREHOUSE_RELEASE_TIME_HOURS,
                &row[20],
            )?,
            week_range: text(DeliveryTable::COLUMN_WEEK_RANGE, &row[21])?,
        })
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DELIVERED_STATUS
    }
}

/// Reasons a stored row cannot become a [`DeliveryRecord`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("Expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Column {0} is null")]
    Null(&'static str),

    #[error("Column {column} has unsupported type {found}")]
    Type { column: &'static str, found: String },

    #[error("Column {column} holds an invalid date: {value}")]
    InvalidDate { column: &'static str, value: String },
}

fn present<'a>(column: &'static str, cell: &'a Option<CqlValue>) -> Result<&'a CqlValue, RowError> {
    match cell {
        None | Some(CqlValue::Empty) => Err(RowError::Null(column)),
        Some(value) => Ok(value),
    }
}

fn mismatch(column: &'static str, value: &CqlValue) -> RowError {
    RowError::Type {
        column,
        found: cql_type_name(value).to_string(),
    }
}

fn text(column: &'static str, cell: &Option<CqlValue>) -> Result<String, RowError> {
    match present(column, cell)? {
        CqlValue::Text(s) | CqlValue::Ascii(s) => Ok(s.clone()),
        other => Err(mismatch(column, other)),
    }
}

pub(crate) fn identifier(column: &'static str, cell: &Option<CqlValue>) -> Result<String, RowError> {
    match present(column, cell)? {
        CqlValue::Text(s) | CqlValue::Ascii(s) => Ok(s.clone()),
        CqlValue::Int(v) => Ok(v.to_string()),
        CqlValue::BigInt(v) => Ok(v.to_string()),
        CqlValue::Uuid(v) => Ok(v.to_string()),
        other => Err(mismatch(column, other)),
    }
}

fn integer(column: &'static str, cell: &Option<CqlValue>) -> Result<i64, RowError> {
    match present(column, cell)? {
        CqlValue::TinyInt(v) => Ok(i64::from(*v)),
        CqlValue::SmallInt(v) => Ok(i64::from(*v)),
        CqlValue::Int(v) => Ok(i64::from(*v)),
        CqlValue::BigInt(v) => Ok(*v),
        CqlValue::Counter(c) => Ok(c.0),
        CqlValue::Varint(v) => signed_be(v.as_signed_bytes_be_slice())
            .and_then(|n| i64::try_from(n).ok())
            .ok_or_else(|| mismatch(column, &CqlValue::Varint(v.clone()))),
        other => Err(mismatch(column, other)),
    }
}

fn real(column: &'static str, cell: &Option<CqlValue>) -> Result<f64, RowError> {
    match present(column, cell)? {
        CqlValue::Double(v) => Ok(*v),
        CqlValue::Float(v) => Ok(f64::from(*v)),
        CqlValue::TinyInt(v) => Ok(f64::from(*v)),
        CqlValue::SmallInt(v) => Ok(f64::from(*v)),
        CqlValue::Int(v) => Ok(f64::from(*v)),
        CqlValue::BigInt(v) => Ok(*v as f64),
        CqlValue::Decimal(d) => {
            let (bytes, scale) = d.as_signed_be_bytes_slice_and_exponent();
            decimal_to_f64(bytes, scale).ok_or_else(|| mismatch(column, &CqlValue::Decimal(d.clone())))
        }
        other => Err(mismatch(column, other)),
    }
}

fn date(column: &'static str, cell: &Option<CqlValue>) -> Result<NaiveDateTime, RowError> {
    match present(column, cell)? {
        CqlValue::Date(d) => {
            // CQL dates count days with the unix epoch at 2^31
            let days = i64::from(d.0) - (1i64 << 31);
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days)))
                .map(|day| day.and_time(NaiveTime::MIN))
                .ok_or_else(|| RowError::InvalidDate {
                    column,
                    value: d.0.to_string(),
                })
        }
        CqlValue::Timestamp(ts) => DateTime::from_timestamp_millis(ts.0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| RowError::InvalidDate {
                column,
                value: ts.0.to_string(),
            }),
        CqlValue::Text(s) | CqlValue::Ascii(s) => {
            parse_date_text(s).ok_or_else(|| RowError::InvalidDate {
                column,
                value: s.clone(),
            })
        }
        other => Err(mismatch(column, other)),
    }
}

/// Sign-extend a big-endian two's complement integer of at most 16 bytes.
fn signed_be(bytes: &[u8]) -> Option<i128> {
    if bytes.len() > 16 {
        return None;
    }
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

fn decimal_to_f64(bytes: &[u8], scale: i32) -> Option<f64> {
    signed_be(bytes).map(|unscaled| unscaled as f64 / 10f64.powi(scale))
}

fn cql_type_name(value: &CqlValue) -> &'static str {
    match value {
        CqlValue::Ascii(_) => "ascii",
        CqlValue::Boolean(_) => "boolean",
        CqlValue::Blob(_) => "blob",
        CqlValue::Counter(_) => "counter",
        CqlValue::Decimal(_) => "decimal",
        CqlValue::Date(_) => "date",
        CqlValue::Double(_) => "double",
        CqlValue::Duration(_) => "duration",
        CqlValue::Empty => "empty",
        CqlValue::Float(_) => "float",
        CqlValue::Int(_) => "int",
        CqlValue::BigInt(_) => "bigint",
        CqlValue::Text(_) => "text",
        CqlValue::Timestamp(_) => "timestamp",
        CqlValue::Inet(_) => "inet",
        CqlValue::List(_) => "list",
        CqlValue::Map(_) => "map",
        CqlValue::Set(_) => "set",
        CqlValue::UserDefinedType { .. } => "udt",
        CqlValue::SmallInt(_) => "smallint",
        CqlValue::TinyInt(_) => "tinyint",
        CqlValue::Time(_) => "time",
        CqlValue::Timeuuid(_) => "timeuuid",
        CqlValue::Tuple(_) => "tuple",
        CqlValue::Uuid(_) => "uuid",
        CqlValue::Varint(_) => "varint",
        _ => "unknown",
    }
}

/// Parse the textual date layouts found in the store and in exported CSV.
pub fn parse_date_text(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(day.and_time(NaiveTime::MIN));
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Midnight values print as a bare date, anything else with the time of day.
pub fn format_date(value: &NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub mod date_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_date_text(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }
}
