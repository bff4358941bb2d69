//! Hive-style partition directories.

/// Directory value used for a null partition value.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Escape a partition value. Characters outside `[A-Za-z0-9._-]` are
/// percent-encoded byte by byte.
pub fn escape_partition_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}

/// Relative directory for one partition, e.g. `year=2018/month=11/`.
/// Empty when there are no partition columns.
pub fn partition_dir(columns: &[&str], values: &[Option<String>]) -> String {
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| {
            let value = match value {
                Some(value) if !value.is_empty() => escape_partition_value(value),
                _ => HIVE_DEFAULT_PARTITION.to_string(),
            };
            format!("{column}={value}/")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_dir() {
        let dir = partition_dir(
            &["year", "artist_id"],
            &[Some("1994".to_string()), Some("ARD7TVE1187B99BFB1".to_string())],
        );
        assert_eq!(dir, "year=1994/artist_id=ARD7TVE1187B99BFB1/");
        assert_eq!(partition_dir(&[], &[]), "");
    }

    #[test]
    fn test_null_and_empty_values() {
        assert_eq!(
            partition_dir(&["year", "month"], &[None, Some(String::new())]),
            "year=__HIVE_DEFAULT_PARTITION__/month=__HIVE_DEFAULT_PARTITION__/"
        );
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_partition_value("AR-1_x.y"), "AR-1_x.y");
        assert_eq!(escape_partition_value("a/b c"), "a%2Fb%20c");
        assert_eq!(escape_partition_value("=%"), "%3D%25");
        assert_eq!(escape_partition_value("é"), "%C3%A9");
    }
}
