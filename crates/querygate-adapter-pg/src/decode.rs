//! Postgres row to JSON record conversion.

use bigdecimal::BigDecimal;
use querygate_core::Record;
use serde_json::Value;
use sqlx::postgres::{PgRow, PgValueFormat};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef};

/// Convert a row to a record keyed by column name.
///
/// Values are decoded by the column's declared type. NULLs and values that
/// fail to decode become JSON null.
pub fn row_to_record(row: &PgRow) -> Record {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name());
        record.insert(column.name().to_string(), value);
    }
    record
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => get::<bool>(row, idx).map(Value::from),
        "INT2" => get::<i16>(row, idx).map(Value::from),
        "INT4" => get::<i32>(row, idx).map(Value::from),
        "INT8" => get::<i64>(row, idx).map(Value::from),
        "FLOAT4" => get::<f32>(row, idx).map(Value::from),
        "FLOAT8" => get::<f64>(row, idx).map(Value::from),
        // Kept as a string so no precision is lost.
        "NUMERIC" => numeric(row, idx).map(Value::from),
        "JSON" | "JSONB" => get::<Value>(row, idx),
        "UUID" => get::<uuid::Uuid>(row, idx).map(|v| Value::from(v.to_string())),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|v| Value::from(v.to_rfc3339())),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|v| Value::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, idx).map(|v| Value::from(v.to_string())),
        "TIME" => get::<chrono::NaiveTime>(row, idx).map(|v| Value::from(v.to_string())),
        "BYTEA" => get::<Vec<u8>>(row, idx).map(|v| Value::from(bytea_hex(&v))),
        _ => get::<String>(row, idx).map(Value::from),
    }
    .unwrap_or(Value::Null)
}

/// `Some(value)` for a non-null decodable value, `None` otherwise.
fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(value) => value,
        Err(e) => {
            let column = row.column(idx);
            tracing::warn!(
                column = column.name(),
                pg_type = column.type_info().name(),
                error = %e,
                "column not decodable, returning null"
            );
            None
        }
    }
}

/// NUMERIC rendered with the value's own display scale, so `12.30` stays
/// `12.30`. sqlx decodes into a `BigDecimal` whose scale is rounded up to
/// whole base-10000 digits; the scale is restored from the wire header.
fn numeric(row: &PgRow, idx: usize) -> Option<String> {
    let raw = row.try_get_raw(idx).ok()?;
    if raw.is_null() {
        return None;
    }
    match raw.format() {
        PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
        PgValueFormat::Binary => {
            let header = NumericHeader::parse(raw.as_bytes().ok()?)?;
            if let Some(special) = header.special() {
                return Some(special.to_string());
            }
            let value = get::<BigDecimal>(row, idx)?;
            Some(plain_string(&value.with_scale(i64::from(header.dscale))))
        }
    }
}

/// The fixed part of a binary NUMERIC: ndigits, weight, sign, dscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumericHeader {
    sign: u16,
    dscale: u16,
}

impl NumericHeader {
    const NAN: u16 = 0xC000;
    const PINF: u16 = 0xD000;
    const NINF: u16 = 0xF000;

    fn parse(bytes: &[u8]) -> Option<Self> {
        let sign = bytes.get(4..6)?;
        let dscale = bytes.get(6..8)?;
        Some(Self {
            sign: u16::from_be_bytes([sign[0], sign[1]]),
            dscale: u16::from_be_bytes([dscale[0], dscale[1]]),
        })
    }

    fn special(&self) -> Option<&'static str> {
        match self.sign {
            Self::NAN => Some("NaN"),
            Self::PINF => Some("Infinity"),
            Self::NINF => Some("-Infinity"),
            _ => None,
        }
    }
}

/// Positional notation with exactly `scale` fractional digits.
fn plain_string(value: &BigDecimal) -> String {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    let text = unscaled.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        return format!("{sign}{digits}{zeros}");
    }

    let scale = scale as usize;
    let digits = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
    } else {
        digits.to_string()
    };
    let (int, frac) = digits.split_at(digits.len() - scale);
    format!("{sign}{int}.{frac}")
}

/// Postgres hex output format for bytea: `\x0a1b...`.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
