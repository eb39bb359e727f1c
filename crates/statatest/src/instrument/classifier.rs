//! Line Classification
//!
//! Lexical heuristic deciding which physical lines of a do/ado file receive a
//! coverage probe. This is not a parser: it only looks at one line at a time
//! plus a two-state continuation machine carried between calls.
//!
//! ```text
//!            line ends in ///                line ends in ///
//!   NORMAL ───────────────────► IN_CONTINUATION ◄──────┐
//!     ▲                               │   └────────────┘
//!     └───────────────────────────────┘
//!         line does not end in ///
//! ```
//!
//! Outside a continuation the skip rules in [`SKIP_RULES`] are tried in order;
//! the first match wins. Inside a continuation every line is executable.

use regex::Regex;
use std::sync::LazyLock;

/// Stata's line-continuation marker
pub const CONTINUATION_MARKER: &str = "///";

/// Structural lines: program scaffolding, pragmas, argument binding, braces.
static STRUCTURAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"(?ix)^\s*(?:
            program\s+define\s+
          | program\s+drop\s+
          | end\s*$
          | version\s+
          | syntax\s+
          | args\s+
          | marksample\s+
          | mata\s*:
          | mata\s*$
          | end\s+mata
          | \{
          | \}
          | else\s*\{?\s*$
        )",
    )
    .expect("structural pattern is a valid regular expression")
});

/// Continuation state carried from one line to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationState {
    /// Between statements
    #[default]
    Normal,
    /// The previous line ended in `///`
    InContinuation,
}

/// A rule that marks a line as not executable when outside a continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipRule {
    /// Empty or whitespace-only line
    Blank,
    /// `*`, `//`, `/*` or `*/` comment line
    Comment,
    /// Program open/close, `version`, `syntax`, `args`, braces
    Structural,
    /// A line holding nothing but a leading `///`
    BareContinuation,
}

/// Skip rules in precedence order
pub const SKIP_RULES: [SkipRule; 4] = [
    SkipRule::Blank,
    SkipRule::Comment,
    SkipRule::Structural,
    SkipRule::BareContinuation,
];

impl SkipRule {
    /// Check whether this rule matches a raw line
    #[must_use]
    pub fn matches(self, line: &str) -> bool {
        let trimmed = line.trim();
        match self {
            Self::Blank => trimmed.is_empty(),
            Self::Comment => ["*", "//", "/*", "*/"]
                .iter()
                .any(|prefix| trimmed.starts_with(prefix)),
            Self::Structural => STRUCTURAL_PATTERN.is_match(line),
            Self::BareContinuation => trimmed.starts_with(CONTINUATION_MARKER),
        }
    }
}

/// Outcome of classifying one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Whether the line receives a probe
    pub executable: bool,
    /// Rule that excluded the line, if any
    pub skipped_by: Option<SkipRule>,
    /// State to carry into the next line
    pub next: ContinuationState,
}

/// Check whether a line opens (or extends) a continuation.
///
/// A `//` comment that happens to end in `///` does not continue anything,
/// and neither does a line that is only the marker.
#[must_use]
pub fn ends_with_continuation(line: &str) -> bool {
    let trimmed_end = line.trim_end();
    trimmed_end.ends_with(CONTINUATION_MARKER) && !trimmed_end.trim_start().starts_with("//")
}

/// Classify a single line given the state left by the previous line.
#[must_use]
pub fn classify_line(line: &str, state: ContinuationState) -> Classification {
    let continues = ends_with_continuation(line);
    let next = if continues {
        ContinuationState::InContinuation
    } else {
        ContinuationState::Normal
    };

    if state == ContinuationState::InContinuation || continues {
        return Classification {
            executable: true,
            skipped_by: None,
            next,
        };
    }

    let skipped_by = SKIP_RULES.iter().copied().find(|rule| rule.matches(line));
    Classification {
        executable: skipped_by.is_none(),
        skipped_by,
        next,
    }
}

/// Stateful line classifier for walking a whole file
#[derive(Debug, Clone, Default)]
pub struct LineClassifier {
    state: ContinuationState,
}

impl LineClassifier {
    /// Create a classifier in the `Normal` state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current continuation state
    #[must_use]
    pub const fn state(&self) -> ContinuationState {
        self.state
    }

    /// Classify the next line and advance the state machine
    pub fn classify(&mut self, line: &str) -> Classification {
        let classification = classify_line(line, self.state);
        self.state = classification.next;
        classification
    }
}

/// Iterate `(original_line_number, line, executable)` over source text.
///
/// Line numbers are 1-based. This is the single classification pass shared by
/// instrumentation and total-line counting.
pub fn classify_source(source: &str) -> impl Iterator<Item = (usize, &str, bool)> {
    let mut classifier = LineClassifier::new();
    source
        .split('\n')
        .enumerate()
        .map(move |(idx, line)| (idx + 1, line, classifier.classify(line).executable))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn executable(line: &str) -> bool {
        classify_line(line, ContinuationState::Normal).executable
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_regular_code_is_executable() {
            assert!(executable("    gen x = 1"));
            assert!(executable("local foo = 42"));
            assert!(executable("    regress y x   "));
            assert!(executable("\tdisplay \"hello\"\t"));
        }

        #[test]
        fn test_blank_lines_skipped() {
            for line in ["", "   ", "\t", "\r"] {
                let c = classify_line(line, ContinuationState::Normal);
                assert!(!c.executable);
                assert_eq!(c.skipped_by, Some(SkipRule::Blank));
            }
        }

        #[test]
        fn test_comment_lines_skipped() {
            for line in [
                "* This is a comment",
                "// Another comment",
                "/* Block comment start",
                "*/ Block comment end",
                "*! myfunction v1.0",
            ] {
                let c = classify_line(line, ContinuationState::Normal);
                assert!(!c.executable, "{line}");
                assert_eq!(c.skipped_by, Some(SkipRule::Comment));
            }
        }

        #[test]
        fn test_structural_lines_skipped() {
            for line in [
                "program define myprogram",
                "program drop myprogram",
                "end",
                "    end",
                "version 16",
                "    syntax anything",
                "    args x y z",
                "    marksample touse",
                "mata:",
                "mata",
                "end mata",
                "{",
                "    }",
                "else {",
                "else",
                "PROGRAM DEFINE upper",
            ] {
                let c = classify_line(line, ContinuationState::Normal);
                assert!(!c.executable, "{line}");
                assert_eq!(c.skipped_by, Some(SkipRule::Structural), "{line}");
            }
        }

        #[test]
        fn test_keyword_prefixes_are_not_structural() {
            assert!(executable("endif_flag = 1"));
            assert!(executable("versioned = 2"));
            assert!(executable("local syntaxes 3"));
        }

        #[test]
        fn test_bare_continuation_is_noise() {
            let c = classify_line("///", ContinuationState::Normal);
            assert!(!c.executable);
            assert_eq!(c.next, ContinuationState::Normal);

            let c = classify_line("    /// continuation comment", ContinuationState::Normal);
            assert!(!c.executable);
            assert_eq!(c.next, ContinuationState::Normal);
        }

        #[test]
        fn test_bare_continuation_rule_matches_directly() {
            assert!(SkipRule::BareContinuation.matches("   /// x"));
            assert!(!SkipRule::BareContinuation.matches("gen x = 1 ///"));
        }

        #[test]
        fn test_rules_are_evaluated_in_order() {
            assert_eq!(
                classify_line("*/", ContinuationState::Normal).skipped_by,
                Some(SkipRule::Comment)
            );
            assert_eq!(
                classify_line("{", ContinuationState::Normal).skipped_by,
                Some(SkipRule::Structural)
            );
        }
    }

    mod continuation_tests {
        use super::*;

        #[test]
        fn test_ends_with_continuation_basic() {
            assert!(ends_with_continuation("reghdfe y x ///"));
            assert!(ends_with_continuation("    , absorb(id) ///"));
            assert!(!ends_with_continuation("reghdfe y x"));
            assert!(!ends_with_continuation("// comment with /// inside"));
            assert!(!ends_with_continuation("///"));
        }

        #[test]
        fn test_ends_with_continuation_trailing_whitespace() {
            assert!(ends_with_continuation("reghdfe y x ///  "));
            assert!(ends_with_continuation("reghdfe y x ///\t"));
            assert!(ends_with_continuation("reghdfe y x ///\r"));
        }

        #[test]
        fn test_opening_line_is_always_executable() {
            let c = classify_line("program define foo ///", ContinuationState::Normal);
            assert!(c.executable);
            assert_eq!(c.next, ContinuationState::InContinuation);
        }

        #[test]
        fn test_continuation_body_ignores_skip_rules() {
            let inside = ContinuationState::InContinuation;
            assert!(classify_line("    , absorb(id)", inside).executable);
            assert!(classify_line("    /// comment", inside).executable);
            assert!(classify_line("* looks like a comment", inside).executable);
            assert!(classify_line("", inside).executable);
        }

        #[test]
        fn test_three_line_block() {
            let mut classifier = LineClassifier::new();
            let first = classifier.classify("gen x = 1 + ///");
            let middle = classifier.classify("  * 2 ///");
            let last = classifier.classify("  3");
            assert!(first.executable && middle.executable && last.executable);
            assert_eq!(classifier.state(), ContinuationState::Normal);
        }

        #[test]
        fn test_state_returns_to_normal_after_block() {
            let mut classifier = LineClassifier::new();
            classifier.classify("reghdfe y x ///");
            assert_eq!(classifier.state(), ContinuationState::InContinuation);
            classifier.classify("    vce(cluster id)");
            assert_eq!(classifier.state(), ContinuationState::Normal);
            assert!(!classifier.classify("* comment").executable);
        }
    }

    mod classify_source_tests {
        use super::*;

        #[test]
        fn test_line_numbers_are_one_based() {
            let lines: Vec<_> = classify_source("gen x = 1\n\ngen y = 2")
                .filter(|(_, _, exec)| *exec)
                .map(|(n, _, _)| n)
                .collect();
            assert_eq!(lines, vec![1, 3]);
        }

        #[test]
        fn test_multiple_continuation_blocks() {
            let source = "\
program define mytest
    version 16
    * First multi-line command
    gen x = 1 + ///
        2 + ///
        3
    * Second multi-line command
    gen y = 4 + ///
        5
end
";
            let lines: Vec<_> = classify_source(source)
                .filter(|(_, _, exec)| *exec)
                .map(|(n, _, _)| n)
                .collect();
            assert_eq!(lines, vec![4, 5, 6, 8, 9]);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn padded_assignments_are_executable(
                name in "[a-z][a-z0-9]{0,8}",
                lead in "[ \t]{0,4}",
                trail in "[ \t]{0,4}",
            ) {
                let line = format!("{lead}gen {name} = 1{trail}");
                prop_assert!(executable(&line));
            }

            #[test]
            fn comments_are_never_executable(body in "[a-zA-Z0-9 ]{0,20}") {
                let star = format!("* {body}");
                let slash = format!("// {body}");
                prop_assert!(!executable(&star));
                prop_assert!(!executable(&slash));
            }
        }
    }
}
