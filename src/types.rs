use serde::Serialize;
use serde_json::Value;

/// A positioned point marker in map coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    // Overlay text for numbered categories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Marker {
    /// Leaflet expects `[lat, lng]`, which in the game's simple CRS is `[y, x]`.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.y, self.x]
    }
}

/// Why a raw record could not become a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDefect {
    NotAnObject,
    MissingX,
    MissingY,
}

/// Reads one `{x, y, amount?}` record.
///
/// `x` and `y` must be numbers. `amount` is only read for numbered
/// categories; integers keep their exact text, integral floats are
/// accepted, anything else leaves the marker unlabeled.
pub fn parse_record(record: &Value, numbered: bool) -> Result<Marker, RecordDefect> {
    let obj = record.as_object().ok_or(RecordDefect::NotAnObject)?;
    let x = obj.get("x").and_then(Value::as_f64).ok_or(RecordDefect::MissingX)?;
    let y = obj.get("y").and_then(Value::as_f64).ok_or(RecordDefect::MissingY)?;

    let label = if numbered {
        obj.get("amount").and_then(amount_text)
    } else {
        None
    };

    Ok(Marker { x, y, label })
}

fn amount_text(value: &Value) -> Option<String> {
    let Value::Number(number) = value else {
        return None;
    };
    if number.is_i64() || number.is_u64() {
        return Some(number.to_string());
    }
    number
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15)
        .map(|f| format!("{}", f as i64))
}
