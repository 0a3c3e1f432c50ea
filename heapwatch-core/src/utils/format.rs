const BYTES_PER_GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Placeholder written for byte-counts the JVM reports as undefined.
pub const UNDEFINED: &str = "n/a";

pub fn bytes_to_gigabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIGABYTE
}

/// Renders a byte-count as binary gigabytes.
///
/// Uses the shortest representation that round-trips and always keeps a
/// fractional part, so whole numbers come out as `1.0` rather than `1`.
pub fn format_gigabytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{:?}", bytes_to_gigabytes(bytes)),
        None => UNDEFINED.to_string(),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    let gb = mb / 1024.0;

    if gb >= 1f64 {
        format!("{gb:.2} GB")
    } else if mb >= 1f64 {
        format!("{mb:.2} MB")
    } else if kb >= 1f64 {
        format!("{kb:.2} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
///
/// ```
/// use heapwatch_core::utils::format::escape_csv_field;
///
/// assert_eq!(escape_csv_field("plain"), "plain");
/// assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
/// assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
