use serde::Serialize;

/// One wrapped line and the top-left point it is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Greedy word wrap.
///
/// Words are separated by single spaces; runs of spaces collapse. A candidate line
/// (current line, the next word and a trailing space) that measures wider than
/// `max_width` is committed without that word, unless the line is still empty, so a
/// single word wider than `max_width` sits alone on its own line. The final line is
/// always emitted, which makes empty input a single empty line.
pub fn wrap_text<F>(
    text: &str,
    max_width: f32,
    measure: F,
    line_height: f32,
    start_x: f32,
    start_y: f32,
) -> Vec<PositionedLine>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut y = start_y;

    for word in text.split(' ').filter(|word| !word.is_empty()) {
        let mut candidate = String::with_capacity(current.len() + word.len() + 1);
        candidate.push_str(&current);
        candidate.push_str(word);
        candidate.push(' ');
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(PositionedLine {
                text: finish_line(&current),
                x: start_x,
                y,
            });
            y += line_height;
            current.clear();
            current.push_str(word);
            current.push(' ');
        } else {
            current = candidate;
        }
    }

    lines.push(PositionedLine {
        text: finish_line(&current),
        x: start_x,
        y,
    });
    lines
}

fn finish_line(line: &str) -> String {
    line.strip_suffix(' ').unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::fixed_advance;

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = wrap_text("Hi Bob", 400.0, |line| fixed_advance(line, 25.0), 36.0, 200.0, 100.0);
        assert_eq!(
            lines,
            vec![PositionedLine {
                text: "Hi Bob".to_string(),
                x: 200.0,
                y: 100.0
            }]
        );
    }

    #[test]
    fn breaks_before_the_overflowing_word() {
        // 10px per char: "aaa bbb " is 80, "aaa bbb ccc " is 120.
        let lines = wrap_text("aaa bbb ccc dd", 100.0, |line| fixed_advance(line, 10.0), 12.0, 5.0, 7.0);
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc dd"]);
        assert_eq!(lines[0].y, 7.0);
        assert_eq!(lines[1].y, 19.0);
        assert!(lines.iter().all(|line| line.x == 5.0));
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_text("a verylongword b", 50.0, |line| fixed_advance(line, 10.0), 10.0, 0.0, 0.0);
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "verylongword", "b"]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        let lines = wrap_text("", 100.0, |line| fixed_advance(line, 10.0), 10.0, 3.0, 4.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "");
        assert_eq!((lines[0].x, lines[0].y), (3.0, 4.0));
    }

    #[test]
    fn repeated_spaces_collapse() {
        let lines = wrap_text("  a   b  ", 1000.0, |line| fixed_advance(line, 10.0), 10.0, 0.0, 0.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "a b");
    }

    #[test]
    fn non_positive_width_puts_one_word_per_line() {
        let lines = wrap_text("one two three", 0.0, |line| fixed_advance(line, 10.0), 10.0, 0.0, 0.0);
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(lines[2].y, 20.0);
    }

    #[test]
    fn multi_word_lines_never_exceed_width() {
        let text = "the quick brown fox jumps over the lazy dog while a very_long_identifier_here passes by";
        for max_width in [30.0f32, 55.0, 80.0, 120.0, 200.0] {
            let measure = |line: &str| fixed_advance(line, 6.0);
            for line in wrap_text(text, max_width, measure, 10.0, 0.0, 0.0) {
                if line.text.contains(' ') {
                    assert!(
                        measure(&line.text) <= max_width,
                        "line {:?} exceeds {}",
                        line.text,
                        max_width
                    );
                }
            }
        }
    }
}
