//! Newtype domain identifiers.
//!
//! Every GitHub concept the router handles is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`CommentId`] with an [`IssueNumber`] even though both are `u64` under the
//! hood and both travel through the same slot of a correlation token.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies an issue comment (or a pull request conversation comment).
    ///
    /// GitHub assigns these globally; they are not scoped to an issue.
    CommentId
}

u64_id! {
    /// The per-repository number of an issue or pull request.
    ///
    /// Pull requests share the issue number space, so comments on a PR are
    /// created through the issues API with this number.
    IssueNumber
}

u64_id! {
    /// Identifies a GitHub App installation.
    ///
    /// Every REST call the router makes is authorised with a token minted for
    /// the installation that delivered the webhook.
    InstallationId
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (logins and Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// Login of the account (user or organisation) that owns a repository.
    OwnerLogin
}

string_id! {
    /// Short name of a repository, without the owner prefix.
    RepositoryName
}

string_id! {
    /// Login of a GitHub user, used for `@` mentions.
    UserLogin
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"feature/ci-bridge"`).
    BranchName
}

string_id! {
    /// A workflow file name or numeric workflow id as accepted by the
    /// workflow-dispatch endpoint (e.g. `"test.yml"`).
    WorkflowId
}
