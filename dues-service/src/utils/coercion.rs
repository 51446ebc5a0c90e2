//! Lenient reads of loosely-typed document fields.
//!
//! Payment documents are mutated by external writers, so `amount` and `paidAt`
//! may hold anything. Aggregation must stay computable regardless.

use mongodb::bson::Bson;

/// Numeric value of an amount field. Missing, null and non-numeric values
/// count as 0, as do NaN and infinities.
pub fn coerce_amount(value: Option<&Bson>) -> f64 {
    let amount = match value {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Bson::Boolean(true)) => 1.0,
        _ => 0.0,
    };

    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

/// Whether a field counts as "set". Null, false, zero, NaN and the empty
/// string do not; timestamps and any other value do.
pub fn is_truthy(value: Option<&Bson>) -> bool {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => false,
        Some(Bson::Boolean(b)) => *b,
        Some(Bson::Int32(v)) => *v != 0,
        Some(Bson::Int64(v)) => *v != 0,
        Some(Bson::Double(v)) => *v != 0.0 && !v.is_nan(),
        Some(Bson::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
