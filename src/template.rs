//! `*name*` placeholder scanning and substitution.
//!
//! A token is a `*`, one or more non-`*` characters, and a closing `*`. Names and
//! headers are compared after trimming both sides; the first matching header wins.
//! Tokens with no matching header, or whose cell is empty, are left in the output
//! verbatim so the author can see them.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Text between the asterisks, untrimmed.
    pub name: String,
    /// Byte offset of the opening `*`.
    pub start: usize,
    /// Byte offset just past the closing `*`.
    pub end: usize,
}

pub fn placeholders(template: &str) -> Vec<Placeholder> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'*' {
            i += 1;
            continue;
        }
        let Some(offset) = bytes[i + 1..].iter().position(|b| *b == b'*') else {
            break;
        };
        let close = i + 1 + offset;
        if close == i + 1 {
            // "**" carries no name; retry from the second asterisk.
            i += 1;
            continue;
        }
        found.push(Placeholder {
            name: template[i + 1..close].to_string(),
            start: i,
            end: close + 1,
        });
        i = close + 1;
    }
    found
}

pub fn resolve<H, C>(template: &str, headers: &[H], row: &[C]) -> String
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0usize;
    for placeholder in placeholders(template) {
        out.push_str(&template[cursor..placeholder.start]);
        match lookup(&placeholder.name, headers, row) {
            Some(value) => out.push_str(value),
            None => out.push_str(&template[placeholder.start..placeholder.end]),
        }
        cursor = placeholder.end;
    }
    out.push_str(&template[cursor..]);
    out
}

/// Names of tokens that [`resolve`] would leave untouched for this row.
pub fn unresolved_placeholders<H, C>(template: &str, headers: &[H], row: &[C]) -> Vec<String>
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    placeholders(template)
        .into_iter()
        .filter(|placeholder| lookup(&placeholder.name, headers, row).is_none())
        .map(|placeholder| placeholder.name)
        .collect()
}

pub fn append_placeholder(template: &str, header: &str) -> String {
    format!("{} *{}*", template, header.trim())
}

fn lookup<'a, H, C>(name: &str, headers: &[H], row: &'a [C]) -> Option<&'a str>
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    let name = name.trim();
    let index = headers
        .iter()
        .position(|header| header.as_ref().trim() == name)?;
    let value = row.get(index)?.as_ref();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_matching_column() {
        assert_eq!(resolve("Olá *NOME*", &["NOME"], &["Ana"]), "Olá Ana");
    }

    #[test]
    fn unmatched_token_is_left_visible() {
        assert_eq!(resolve("Hello *X*", &["Y"], &["v"]), "Hello *X*");
    }

    #[test]
    fn empty_cell_keeps_token() {
        assert_eq!(resolve("Hi *NAME*", &["NAME"], &[""]), "Hi *NAME*");
    }

    #[test]
    fn missing_cell_keeps_token() {
        let row: [&str; 0] = [];
        assert_eq!(resolve("Hi *NAME*", &["NAME"], &row), "Hi *NAME*");
    }

    #[test]
    fn names_and_headers_are_trimmed_but_values_are_not() {
        assert_eq!(
            resolve("[* CODIGO *]", &["  CODIGO"], &["  42 "]),
            "[  42 ]"
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(resolve("*nome*", &["NOME"], &["Ana"]), "*nome*");
    }

    #[test]
    fn first_duplicate_header_wins() {
        assert_eq!(resolve("*A*", &["A", "A"], &["first", "second"]), "first");
        assert_eq!(resolve("*A*", &["A", "A"], &["", "second"]), "*A*");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        assert_eq!(resolve("*A*", &["A", "B"], &["*B*", "b"]), "*B*");
    }

    #[test]
    fn several_tokens_and_plain_text() {
        assert_eq!(
            resolve(
                "Olá *NOME*, seu código é *CODIGO*.",
                &["NOME", "CODIGO"],
                &["Ana", "X1"]
            ),
            "Olá Ana, seu código é X1."
        );
    }

    #[test]
    fn double_asterisk_is_not_a_token() {
        let found = placeholders("**x* and *");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "x");
        assert_eq!((found[0].start, found[0].end), (1, 4));
        assert_eq!(resolve("**x* and *", &["x"], &["1"]), "*1 and *");
    }

    #[test]
    fn resolve_is_deterministic() {
        let headers = ["a", "b"];
        let row = ["1", ""];
        let first = resolve("*a* *b* *c*", &headers, &row);
        let second = resolve("*a* *b* *c*", &headers, &row);
        assert_eq!(first, second);
        assert_eq!(first, "1 *b* *c*");
    }

    #[test]
    fn reports_unresolved_names() {
        let unresolved = unresolved_placeholders("*a* *b* *c*", &["a", "b"], &["1", ""]);
        assert_eq!(unresolved, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn appends_trimmed_header_token() {
        assert_eq!(append_placeholder("Olá", " NOME "), "Olá *NOME*");
    }
}
