use std::ascii;

/// Renders bytes as printable ASCII, escaping everything else the way
/// [ascii::escape_default] does, e.g. `b"put 1\r\n"` becomes `put 1\r\n`.
pub fn bytes_to_human_str(input: &[u8]) -> String {
    input
        .iter()
        .flat_map(|&c| ascii::escape_default(c))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_human_str() {
        assert_eq!(bytes_to_human_str(b"USING default"), "USING default");
        assert_eq!(bytes_to_human_str(b"put 1\r\n"), "put 1\\r\\n");
        assert_eq!(bytes_to_human_str(b"\x00\xff'"), "\\x00\\xff\\'");
    }
}
