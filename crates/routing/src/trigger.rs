//! Trigger keyword detection.
//!
//! A pull request title triggers CI when it contains the bare keyword. A
//! comment triggers CI only with the suffixed form `<keyword>_<branch>`, and the
//! suffix names the branch the workflow is dispatched on.

use regex::Regex;

use crate::BranchName;

/// Keyword recognised when no other is configured.
pub const DEFAULT_TRIGGER_KEYWORD: &str = "trigger-ci";

/// Compiled matcher for one trigger keyword.
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    keyword: String,
    neutralised: String,
    branch_pattern: Regex,
}

impl TriggerMatcher {
    /// Compiles a matcher for `keyword`.
    ///
    /// The branch suffix accepts word characters plus `-`, `.` and `/`, so
    /// `trigger-ci_feature/x-1` yields `feature/x-1`.
    pub fn new(keyword: &str) -> Result<Self, regex::Error> {
        let branch_pattern = Regex::new(&format!(r"{}_([\w\-./]+)", regex::escape(keyword)))?;
        Ok(Self {
            keyword: keyword.to_string(),
            neutralised: keyword.to_uppercase().replace('-', ""),
            branch_pattern,
        })
    }

    /// The keyword this matcher looks for.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns `true` if a pull request title asks for a CI run.
    pub fn title_requests_ci(&self, title: &str) -> bool {
        title.contains(&self.keyword)
    }

    /// Extracts the branch named by the first `<keyword>_<branch>` in `body`.
    ///
    /// Trailing `.` and `/` are dropped so a keyword ending a sentence
    /// (`"run trigger-ci_main."`) still names `main`. Returns `None` when the
    /// suffixed form is absent or names nothing.
    pub fn comment_branch(&self, body: &str) -> Option<BranchName> {
        let captures = self.branch_pattern.captures(body)?;
        let branch = captures.get(1)?.as_str().trim_end_matches(['.', '/']);
        BranchName::new(branch)
    }

    /// Replaces every occurrence of the keyword so that re-reading the text
    /// can never trigger again (`trigger-ci` becomes `TRIGGERCI`).
    pub fn neutralise(&self, text: &str) -> String {
        text.replace(&self.keyword, &self.neutralised)
    }
}
