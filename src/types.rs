//! Parquet physical layout to arrow logical type lookup.
//!
//! The annotation table is static and evaluated top to bottom; the first
//! matching rule wins. Columns no rule claims map by physical type alone, so
//! the lookup is total.

use std::sync::Arc;

use arrow::datatypes::{DataType, IntervalUnit, TimeUnit};
use parquet::{
    basic::{ConvertedType, LogicalType, TimeUnit as ParquetTimeUnit, Type as PhysicalType},
    schema::types::ColumnDescriptor,
};

/// Widest decimal precision that still fits `Decimal128`.
const MAX_DECIMAL_PRECISION: i32 = 38;

const UTC: &str = "UTC";

struct TypeRule {
    matches: fn(&ColumnDescriptor) -> bool,
    resolve: fn(&ColumnDescriptor) -> DataType,
}

macro_rules! converted {
    ($converted:ident, $physical:ident, $ty:expr) => {
        TypeRule {
            matches: |column| {
                column.converted_type() == ConvertedType::$converted
                    && column.physical_type() == PhysicalType::$physical
            },
            resolve: |_| $ty,
        }
    };
}

static TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        matches: |column| matches!(column.logical_type(), Some(LogicalType::Uuid)),
        resolve: |_| DataType::FixedSizeBinary(16),
    },
    TypeRule {
        matches: |column| {
            matches!(
                column.logical_type(),
                Some(LogicalType::Timestamp {
                    is_adjusted_to_u_t_c: true,
                    ..
                })
            )
        },
        resolve: |_| DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from(UTC))),
    },
    TypeRule {
        matches: |column| {
            matches!(
                column.logical_type(),
                Some(LogicalType::Timestamp {
                    unit: ParquetTimeUnit::NANOS(_),
                    ..
                })
            )
        },
        resolve: |_| DataType::Timestamp(TimeUnit::Nanosecond, None),
    },
    TypeRule {
        matches: |column| matches!(column.logical_type(), Some(LogicalType::Timestamp { .. })),
        resolve: |_| DataType::Timestamp(TimeUnit::Microsecond, None),
    },
    TypeRule {
        matches: |column| matches!(column.logical_type(), Some(LogicalType::Time { .. })),
        resolve: |_| DataType::Time64(TimeUnit::Microsecond),
    },
    TypeRule {
        matches: |column| matches!(column.logical_type(), Some(LogicalType::Unknown)),
        resolve: |_| DataType::Null,
    },
    converted!(INT_8, INT32, DataType::Int8),
    converted!(INT_16, INT32, DataType::Int16),
    converted!(INT_32, INT32, DataType::Int32),
    converted!(INT_64, INT64, DataType::Int64),
    converted!(UINT_8, INT32, DataType::UInt8),
    converted!(UINT_16, INT32, DataType::UInt16),
    converted!(UINT_32, INT32, DataType::UInt32),
    converted!(UINT_64, INT64, DataType::UInt64),
    converted!(DATE, INT32, DataType::Date32),
    converted!(TIME_MILLIS, INT32, DataType::Time64(TimeUnit::Microsecond)),
    converted!(TIME_MICROS, INT64, DataType::Time64(TimeUnit::Microsecond)),
    converted!(
        TIMESTAMP_MILLIS,
        INT64,
        DataType::Timestamp(TimeUnit::Microsecond, None)
    ),
    converted!(
        TIMESTAMP_MICROS,
        INT64,
        DataType::Timestamp(TimeUnit::Microsecond, None)
    ),
    TypeRule {
        matches: |column| column.converted_type() == ConvertedType::INTERVAL,
        resolve: |_| DataType::Interval(IntervalUnit::DayTime),
    },
    converted!(UTF8, BYTE_ARRAY, DataType::Utf8),
    converted!(ENUM, BYTE_ARRAY, DataType::Utf8),
    converted!(UTF8, FIXED_LEN_BYTE_ARRAY, DataType::Utf8),
    converted!(ENUM, FIXED_LEN_BYTE_ARRAY, DataType::Utf8),
    TypeRule {
        matches: |column| column.converted_type() == ConvertedType::JSON,
        resolve: |_| DataType::Utf8,
    },
    TypeRule {
        matches: |column| column.converted_type() == ConvertedType::DECIMAL,
        resolve: |column| {
            let precision = column.type_precision();
            if precision > MAX_DECIMAL_PRECISION {
                DataType::Float64
            } else {
                DataType::Decimal128(precision as u8, column.type_scale() as i8)
            }
        },
    },
];

/// Logical type of a parquet leaf column.
pub fn logical_type(column: &ColumnDescriptor) -> DataType {
    TYPE_RULES
        .iter()
        .find(|rule| (rule.matches)(column))
        .map(|rule| (rule.resolve)(column))
        .unwrap_or_else(|| physical_fallback(column))
}

fn physical_fallback(column: &ColumnDescriptor) -> DataType {
    match column.physical_type() {
        PhysicalType::BOOLEAN => DataType::Boolean,
        PhysicalType::INT32 => DataType::Int32,
        PhysicalType::INT64 => DataType::Int64,
        PhysicalType::INT96 => DataType::Timestamp(TimeUnit::Microsecond, None),
        PhysicalType::FLOAT => DataType::Float32,
        PhysicalType::DOUBLE => DataType::Float64,
        PhysicalType::BYTE_ARRAY => DataType::Binary,
        PhysicalType::FIXED_LEN_BYTE_ARRAY => DataType::FixedSizeBinary(column.type_length()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::datatypes::{DataType, TimeUnit};
    use parquet::schema::{parser::parse_message_type, types::SchemaDescriptor};

    use super::logical_type;

    fn resolve_all(message: &str) -> Vec<(String, DataType)> {
        let schema = parse_message_type(message).unwrap();
        let descriptor = SchemaDescriptor::new(Arc::new(schema));
        descriptor
            .columns()
            .iter()
            .map(|column| (column.name().to_string(), logical_type(column)))
            .collect()
    }

    #[test]
    fn integer_annotations() {
        let types = resolve_all(
            "message m {
                required int32 a (INT_8);
                required int32 b (INT_16);
                required int32 c (UINT_32);
                required int64 d (UINT_64);
                required int32 e;
                required int64 f;
            }",
        );
        let expected = [
            DataType::Int8,
            DataType::Int16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Int32,
            DataType::Int64,
        ];
        for ((_, actual), expected) in types.iter().zip(expected) {
            assert_eq!(actual, &expected);
        }
    }

    #[test]
    fn string_and_binary() {
        let types = resolve_all(
            "message m {
                optional binary s (UTF8);
                optional binary e (ENUM);
                optional binary j (JSON);
                optional binary raw;
                optional fixed_len_byte_array(4) fixed;
                optional binary doc (BSON);
            }",
        );
        assert_eq!(types[0].1, DataType::Utf8);
        assert_eq!(types[1].1, DataType::Utf8);
        assert_eq!(types[2].1, DataType::Utf8);
        assert_eq!(types[3].1, DataType::Binary);
        assert_eq!(types[4].1, DataType::FixedSizeBinary(4));
        // unrecognised annotation falls back to the physical mapping
        assert_eq!(types[5].1, DataType::Binary);
    }

    #[test]
    fn temporal_types() {
        let types = resolve_all(
            "message m {
                required int64 utc (TIMESTAMP(MICROS, true));
                required int64 nanos (TIMESTAMP(NANOS, false));
                required int64 millis (TIMESTAMP(MILLIS, false));
                required int32 day (DATE);
                required int64 clock (TIME(MICROS, false));
                required int96 legacy;
            }",
        );
        assert_eq!(
            types[0].1,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(types[1].1, DataType::Timestamp(TimeUnit::Nanosecond, None));
        assert_eq!(types[2].1, DataType::Timestamp(TimeUnit::Microsecond, None));
        assert_eq!(types[3].1, DataType::Date32);
        assert_eq!(types[4].1, DataType::Time64(TimeUnit::Microsecond));
        assert_eq!(types[5].1, DataType::Timestamp(TimeUnit::Microsecond, None));
    }

    #[test]
    fn decimals_wider_than_decimal128_become_double() {
        let types = resolve_all(
            "message m {
                required int64 narrow (DECIMAL(18, 2));
                required fixed_len_byte_array(32) wide (DECIMAL(60, 4));
            }",
        );
        assert_eq!(types[0].1, DataType::Decimal128(18, 2));
        assert_eq!(types[1].1, DataType::Float64);
    }
}
