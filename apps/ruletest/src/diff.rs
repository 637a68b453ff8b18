//! Line-level unified diff with zero context lines.

/// One step of an edit script from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal,
    Delete,
    Insert,
}

/// Shortest edit script from `a` to `b`.
///
/// The shared head and tail are matched directly so the quadratic table only
/// spans the changed region.
fn edit_script<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend(std::iter::repeat(Edit::Equal).take(prefix));
    out.extend(lcs_script(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
    ));
    out.extend(std::iter::repeat(Edit::Equal).take(suffix));
    out
}

/// Edit script via a longest-common-subsequence table.
fn lcs_script<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut lcs = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(Edit::Equal);
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            out.push(Edit::Delete);
            i += 1;
        } else {
            out.push(Edit::Insert);
            j += 1;
        }
    }
    out.extend(std::iter::repeat(Edit::Delete).take(n - i));
    out.extend(std::iter::repeat(Edit::Insert).take(m - j));
    out
}

fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}

/// Unified diff of `a` against `b` with no context.
///
/// Lines are compared including their line terminators; emitted lines are
/// trimmed. Returns an empty list when the inputs are identical.
pub fn unified_diff(a: &str, b: &str, a_label: &str, b_label: &str) -> Vec<String> {
    let a_lines: Vec<&str> = a.split_inclusive('\n').collect();
    let b_lines: Vec<&str> = b.split_inclusive('\n').collect();
    let script = edit_script(&a_lines, &b_lines);

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut k = 0;
    while k < script.len() {
        if script[k] == Edit::Equal {
            i += 1;
            j += 1;
            k += 1;
            continue;
        }
        let (i1, j1) = (i, j);
        while k < script.len() && script[k] != Edit::Equal {
            match script[k] {
                Edit::Delete => i += 1,
                Edit::Insert => j += 1,
                Edit::Equal => {}
            }
            k += 1;
        }
        if out.is_empty() {
            out.push(format!("--- {}", a_label).trim().to_string());
            out.push(format!("+++ {}", b_label).trim().to_string());
        }
        out.push(format!("@@ -{} +{} @@", format_range(i1, i), format_range(j1, j)));
        out.extend(a_lines[i1..i].iter().map(|l| format!("-{}", l).trim().to_string()));
        out.extend(b_lines[j1..j].iter().map(|l| format!("+{}", l).trim().to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_empty() {
        let text = "a\nb\nc\n";
        assert!(unified_diff(text, text, "x", "y").is_empty());
    }

    #[test]
    fn test_one_changed_line_is_one_hunk() {
        let d = unified_diff("a\nb\nc\n", "a\nB\nc\n", "old", "new");
        assert_eq!(d, vec!["--- old", "+++ new", "@@ -2 +2 @@", "-b", "+B"]);
        assert_eq!(d.iter().filter(|l| l.starts_with("@@")).count(), 1);
    }

    #[test]
    fn test_insert_and_delete_ranges() {
        let d = unified_diff("a\nc\n", "a\nb\nc\nd\n", "old", "new");
        assert_eq!(
            d,
            vec!["--- old", "+++ new", "@@ -1,0 +2 @@", "+b", "@@ -2,0 +4 @@", "+d"]
        );
        let d = unified_diff("a\nb\nc\n", "a\n", "old", "new");
        assert_eq!(d, vec!["--- old", "+++ new", "@@ -2,2 +1,0 @@", "-b", "-c"]);
    }

    #[test]
    fn test_large_file_with_one_change() {
        let a: String = (0..20_000).map(|i| format!("line {}\n", i)).collect();
        let b = a.replace("line 12345\n", "line twelve\n");
        let d = unified_diff(&a, &b, "old", "new");
        assert_eq!(d, vec!["--- old", "+++ new", "@@ -12346 +12346 @@", "-line 12345", "+line twelve"]);
    }

    #[test]
    fn test_repeated_lines_at_edges() {
        let d = unified_diff("x\nx\nx\n", "x\nx\n", "old", "new");
        assert_eq!(d, vec!["--- old", "+++ new", "@@ -3 +2,0 @@", "-x"]);
    }

    #[test]
    fn test_missing_trailing_newline_differs() {
        let d = unified_diff("a\n", "a", "old", "new");
        assert_eq!(d, vec!["--- old", "+++ new", "@@ -1 +1 @@", "-a", "+a"]);
    }
}
