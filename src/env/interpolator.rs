use std::collections::HashMap;

/// Parse all `{{var}}` spans in `input`.
/// Returns a list of `(start_byte, end_byte, var_name)` where start/end are byte
/// offsets in the original string (inclusive of the `{{` and `}}` delimiters).
/// Names are returned verbatim (no trimming). Empty names and unclosed braces
/// are skipped.
pub fn parse_vars(input: &str) -> Vec<(usize, usize, String)> {
    let mut result = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i + 1 < len {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let inner_start = i + 2;
            match input[inner_start..].find("}}") {
                Some(rel) => {
                    let end = inner_start + rel;
                    let name = &input[inner_start..end];
                    if !name.is_empty() {
                        result.push((i, end + 2, name.to_string()));
                    }
                    i = end + 2;
                }
                // Unclosed, nothing further can match
                None => break,
            }
        } else {
            i += 1;
        }
    }

    result
}

/// Replace every literal `{{key}}` token whose key is present in `vars`.
///
/// Single left-to-right pass: replacement text is never re-scanned, so values
/// that themselves contain `{{...}}` are emitted as-is. Tokens with unknown
/// keys stay verbatim. Keys are matched byte-for-byte, so no character in a
/// key has special meaning.
pub fn substitute(input: &str, vars: &HashMap<String, String>) -> String {
    if vars.is_empty() || !input.contains("{{") {
        return input.to_string();
    }

    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut output = String::with_capacity(input.len());
    let mut last = 0;
    let mut i = 0;

    while i + 1 < len {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let inner_start = i + 2;
            let Some(rel) = input[inner_start..].find("}}") else {
                break;
            };
            let end = inner_start + rel;
            if let Some(value) = vars.get(&input[inner_start..end]) {
                output.push_str(&input[last..i]);
                output.push_str(value);
                i = end + 2;
                last = i;
                continue;
            }
        }
        // On a miss advance a single byte so a token nested after extra
        // braces (`{{{{host}}`) is still found. '{' is ASCII, so any index we
        // stop on while matching is a char boundary.
        i += 1;
    }

    output.push_str(&input[last..]);
    output
}
