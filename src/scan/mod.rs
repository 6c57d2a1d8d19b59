//! Reference scanning
//!
//! Runs an identifier matcher over the lines of a source file and turns
//! each match into a reference carrying the surrounding lines as context.

use crate::matcher::IdentifierMatcher;
use crate::types::Reference;

/// Default number of lines kept before and after each mention
pub const DEFAULT_CONTEXT_LINES: usize = 50;

/// References found in one file
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub references: Vec<Reference>,
    pub lines: u64,
}

/// Finds schema object mentions in source files
pub struct Scanner<'a> {
    matcher: &'a IdentifierMatcher,
    context_lines: usize,
    case_sensitive: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(matcher: &'a IdentifierMatcher) -> Self {
        Self {
            matcher,
            context_lines: DEFAULT_CONTEXT_LINES,
            case_sensitive: false,
        }
    }

    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Scan a file's content for identifier mentions
    pub fn scan_file(&self, file_path: &str, content: &str) -> ScanResult {
        // Offsets advance by the raw line length so `\r\n` counts two chars
        let raw_lines: Vec<&str> = content.split_inclusive('\n').collect();
        let lines: Vec<&str> = raw_lines.iter().map(|raw| strip_line_break(raw)).collect();
        let mut result = ScanResult {
            references: Vec::new(),
            lines: lines.len() as u64,
        };

        let mut line_offset: u64 = 0;
        for (idx, line) in lines.iter().enumerate() {
            let matches = self.matcher.find_all_with_case(line, self.case_sensitive);

            let mut cursor_byte = 0;
            let mut column = 0usize;
            for m in matches {
                column += line[cursor_byte..m.start].chars().count();
                cursor_byte = m.start;

                let reference = Reference::new(m.identifier, file_path, idx as u32 + 1)
                    .with_column(column as u32)
                    .with_offset(line_offset + column as u64)
                    .with_context(
                        self.context_before(&lines, idx),
                        *line,
                        self.context_after(&lines, idx),
                    );
                result.references.push(reference);
            }

            line_offset += raw_lines[idx].chars().count() as u64;
        }

        result
    }

    fn context_before(&self, lines: &[&str], idx: usize) -> Vec<String> {
        let start = idx.saturating_sub(self.context_lines);
        lines[start..idx].iter().map(|l| l.to_string()).collect()
    }

    fn context_after(&self, lines: &[&str], idx: usize) -> Vec<String> {
        let end = (idx + 1 + self.context_lines).min(lines.len());
        lines[idx + 1..end].iter().map(|l| l.to_string()).collect()
    }
}

/// Drop a trailing `\n` or `\r\n`. A bare `\r` is line content.
fn strip_line_break(raw: &str) -> &str {
    match raw.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IdentifierMatcher {
        ["EMPLOYEES", "DEPARTMENTS", "EMP"].into_iter().collect()
    }

    #[test]
    fn test_scan_finds_mentions_with_positions() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher);
        let content = "-- payroll\nSELECT * FROM employees e\nJOIN departments d ON d.id = e.dept_id\n";

        let result = scanner.scan_file("sql/payroll.sql", content);

        assert_eq!(result.lines, 3);
        assert_eq!(result.references.len(), 2);

        let employees = &result.references[0];
        assert_eq!(employees.object_name, "EMPLOYEES");
        assert_eq!(employees.file_path, "sql/payroll.sql");
        assert_eq!(employees.line_number, Some(2));
        assert_eq!(employees.column, 14);
        assert_eq!(employees.char_offset, Some(11 + 14));
        assert_eq!(employees.line_text, "SELECT * FROM employees e");

        let departments = &result.references[1];
        assert_eq!(departments.line_number, Some(3));
        assert_eq!(departments.column, 5);
        assert_eq!(departments.char_offset, Some(11 + 26 + 5));
    }

    #[test]
    fn test_context_is_clipped_to_file_bounds() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher).with_context_lines(2);
        let content = "employees\na\nb\nc\nd\ndepartments";

        let result = scanner.scan_file("x.sql", content);
        assert_eq!(result.references.len(), 2);

        let first = &result.references[0];
        assert!(first.context_before.is_empty());
        assert_eq!(first.context_after, vec!["a", "b"]);

        let last = &result.references[1];
        assert_eq!(last.context_before, vec!["c", "d"]);
        assert!(last.context_after.is_empty());
    }

    #[test]
    fn test_multiple_mentions_on_one_line() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher).with_context_lines(0);

        let result = scanner.scan_file("x.py", "q = 'employees emp departments emp_id'");
        let names: Vec<_> = result.references.iter().map(|r| r.object_name.as_str()).collect();
        assert_eq!(names, vec!["EMPLOYEES", "EMP", "DEPARTMENTS"]);
        assert_eq!(result.references[1].column, 15);
    }

    #[test]
    fn test_case_sensitive_scan() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher).with_case_sensitive(true);

        let result = scanner.scan_file("x.sql", "employees\nEMPLOYEES");
        assert_eq!(result.references.len(), 1);
        assert_eq!(result.references[0].line_number, Some(2));
    }

    #[test]
    fn test_crlf_offsets_count_carriage_returns() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher);

        let result = scanner.scan_file("win.sql", "a\r\nb\r\nc\r\nEMPLOYEES");
        assert_eq!(result.lines, 4);

        let employees = &result.references[0];
        assert_eq!(employees.line_number, Some(4));
        assert_eq!(employees.column, 0);
        assert_eq!(employees.char_offset, Some(9));
        assert_eq!(employees.line_text, "EMPLOYEES");
        assert_eq!(employees.context_before, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_crlf_line_keeps_columns_and_context() {
        let matcher = matcher();
        let scanner = Scanner::new(&matcher);

        let result = scanner.scan_file("win.sql", "SELECT *\r\nFROM employees\r\n");
        let employees = &result.references[0];
        assert_eq!(employees.column, 5);
        assert_eq!(employees.char_offset, Some(10 + 5));
        assert_eq!(employees.line_text, "FROM employees");
        assert_eq!(employees.context_before, vec!["SELECT *"]);
        assert!(employees.context_after.is_empty());
    }

    #[test]
    fn test_empty_file() {
        let matcher = matcher();
        let result = Scanner::new(&matcher).scan_file("empty.sql", "");
        assert_eq!(result.lines, 0);
        assert!(result.references.is_empty());
    }
}
