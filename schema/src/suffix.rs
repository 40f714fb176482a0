//! The dotted-suffix matcher shared by taxonomy resolution and catalog
//! field-extractor lookup.

/// Tests whether the lookup key `key` identifies `field_name` within
/// `schema_name`.
///
/// `key` is a dotted path that may either be fully contained within
/// `field_name` (when `field_name` is at least as long as `key`), or span
/// the boundary between `schema_name` and `field_name` (when `key` is
/// longer, e.g. a query for `connection.src.ip` against a field `src.ip`
/// declared in a schema named `connection`).
pub fn suffix_matches(key: &str, schema_name: &str, field_name: &str) -> bool {
    let k = key.as_bytes();
    let f = field_name.as_bytes();
    if f.len() >= k.len() {
        if !field_name.ends_with(key) {
            return false;
        }
        let pos = f.len() - k.len();
        return pos == 0 || f[pos - 1] == b'.';
    }
    // `key` spans the tail of `schema_name` and all of `field_name`.
    let split = k.len() - f.len();
    let (left, right) = key.split_at(split);
    if right != field_name {
        return false;
    }
    if !left.ends_with('.') {
        return false;
    }
    let left = &left[..left.len() - 1];
    let s = schema_name.as_bytes();
    if left.len() > s.len() {
        return false;
    }
    let spos = s.len() - left.len();
    &schema_name[spos..] == left && (spos == 0 || s[spos - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_field_name_matches() {
        assert!(suffix_matches("src_ip", "conn", "src_ip"));
    }

    #[test]
    fn suffix_within_field_name_matches_at_dot_boundary() {
        assert!(suffix_matches("ip", "conn", "src.ip"));
        assert!(!suffix_matches("ip", "conn", "src_ip"));
    }

    #[test]
    fn key_spanning_schema_and_field_matches() {
        assert!(suffix_matches("conn.src.ip", "conn", "src.ip"));
        assert!(suffix_matches("net.conn.src.ip", "net.conn", "src.ip"));
    }

    #[test]
    fn key_spanning_schema_rejects_non_dot_boundary() {
        assert!(!suffix_matches("nnconn.src.ip", "conn", "src.ip"));
    }

    #[test]
    fn mismatched_field_rejected() {
        assert!(!suffix_matches("dst.ip", "conn", "src.ip"));
    }
}
