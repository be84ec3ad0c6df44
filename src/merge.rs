//! Field-level conflict resolution across provenances.
//!
//! A report field can be supplied by several sources (a task override, the
//! job metadata, ...). The merger picks the first candidate that carries a
//! *meaningful* value for its kind:
//!
//! | Kind | Meaningful when | Nothing meaningful |
//! |---|---|---|
//! | text | non-empty | `""` |
//! | `i64` / `i32` / `isize` | non-zero | `0` |
//! | `f64` / `f32` | non-zero | `0.0` |
//! | [`CodeInfo`] | package type non-empty | absent |
//! | anything else | always | first candidate |
//!
//! An empty candidate list is always absent.
//!
//! Callers state the kind up front, either statically through
//! [`first_meaningful`] or by picking a [`Candidates`] variant.

use serde_json::Value;

use crate::types::CodeInfo;

/// A value kind the merger knows how to test.
pub trait Meaningful: Clone {
    /// Whether this candidate may win resolution.
    fn is_meaningful(&self) -> bool;

    /// What resolution yields when no candidate is meaningful.
    fn exhausted() -> Option<Self>;
}

impl Meaningful for String {
    fn is_meaningful(&self) -> bool {
        !self.is_empty()
    }

    fn exhausted() -> Option<Self> {
        Some(String::new())
    }
}

macro_rules! numeric_meaningful {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Meaningful for $ty {
                fn is_meaningful(&self) -> bool {
                    *self != $zero
                }

                fn exhausted() -> Option<Self> {
                    Some($zero)
                }
            }
        )*
    };
}

numeric_meaningful!(i64 => 0, i32 => 0, isize => 0, f64 => 0.0, f32 => 0.0);

impl Meaningful for CodeInfo {
    fn is_meaningful(&self) -> bool {
        self.is_identified()
    }

    // An unidentified package collapses to absent, not to an empty struct.
    fn exhausted() -> Option<Self> {
        None
    }
}

/// Returns the first meaningful candidate, the kind's empty value when none
/// qualifies, or `None` for an empty list.
///
/// Inputs are never modified; the winner is cloned out.
///
/// # Examples
///
/// ```
/// use tide_audit::merge::first_meaningful;
///
/// let titles = vec![String::new(), "Akismet".to_string()];
/// assert_eq!(first_meaningful(&titles), Some("Akismet".to_string()));
///
/// assert_eq!(first_meaningful(&[0_i64, 0]), Some(0));
/// assert_eq!(first_meaningful::<i32>(&[]), None);
/// ```
pub fn first_meaningful<T: Meaningful>(candidates: &[T]) -> Option<T> {
    if candidates.is_empty() {
        return None;
    }

    candidates
        .iter()
        .find(|candidate| candidate.is_meaningful())
        .cloned()
        .or_else(T::exhausted)
}

/// An ordered candidate list tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    /// Text candidates.
    Text(Vec<String>),
    /// 64-bit integer candidates.
    Int64(Vec<i64>),
    /// 32-bit integer candidates.
    Int32(Vec<i32>),
    /// Platform integer candidates.
    Int(Vec<isize>),
    /// 64-bit float candidates.
    Float64(Vec<f64>),
    /// 32-bit float candidates.
    Float32(Vec<f32>),
    /// Structural code-info candidates.
    CodeInfo(Vec<CodeInfo>),
    /// Values with no notion of emptiness; the first one always wins.
    Other(Vec<Value>),
}

/// The value picked from a [`Candidates`] list, tagged with the same kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Text value.
    Text(String),
    /// 64-bit integer value.
    Int64(i64),
    /// 32-bit integer value.
    Int32(i32),
    /// Platform integer value.
    Int(isize),
    /// 64-bit float value.
    Float64(f64),
    /// 32-bit float value.
    Float32(f32),
    /// Code-info value.
    CodeInfo(CodeInfo),
    /// Opaque value.
    Other(Value),
}

impl Candidates {
    /// Resolve the list to a single value.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use tide_audit::merge::{Candidates, Resolved};
    ///
    /// let picked = Candidates::Other(vec![json!(["a"]), json!(["b"])]).resolve();
    /// assert_eq!(picked, Some(Resolved::Other(json!(["a"]))));
    ///
    /// let picked = Candidates::Float32(vec![0.0, 42.0, 0.0]).resolve();
    /// assert_eq!(picked, Some(Resolved::Float32(42.0)));
    /// ```
    pub fn resolve(&self) -> Option<Resolved> {
        match self {
            Self::Text(values) => first_meaningful(values).map(Resolved::Text),
            Self::Int64(values) => first_meaningful(values).map(Resolved::Int64),
            Self::Int32(values) => first_meaningful(values).map(Resolved::Int32),
            Self::Int(values) => first_meaningful(values).map(Resolved::Int),
            Self::Float64(values) => first_meaningful(values).map(Resolved::Float64),
            Self::Float32(values) => first_meaningful(values).map(Resolved::Float32),
            Self::CodeInfo(values) => first_meaningful(values).map(Resolved::CodeInfo),
            Self::Other(values) => values.first().cloned().map(Resolved::Other),
        }
    }

    /// Number of candidates in the list.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(values) => values.len(),
            Self::Int64(values) => values.len(),
            Self::Int32(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Float64(values) => values.len(),
            Self::Float32(values) => values.len(),
            Self::CodeInfo(values) => values.len(),
            Self::Other(values) => values.len(),
        }
    }

    /// Returns `true` when there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn text_picks_first_non_empty() {
        assert_eq!(
            first_meaningful(&texts(&["", "", "three"])),
            Some("three".to_string())
        );
        assert_eq!(first_meaningful(&texts(&["one", "two"])), Some("one".to_string()));
    }

    #[test]
    fn text_all_empty_yields_empty_text() {
        assert_eq!(first_meaningful(&texts(&["", ""])), Some(String::new()));
    }

    #[test]
    fn integers() {
        assert_eq!(first_meaningful(&[4_i64, 2]), Some(4));
        assert_eq!(first_meaningful(&[0_i64, 0]), Some(0));
        assert_eq!(first_meaningful(&[0_i32, 12]), Some(12));
        assert_eq!(first_meaningful(&[0_i32, 0]), Some(0));
        assert_eq!(first_meaningful(&[0_isize, 0, 42]), Some(42));
        assert_eq!(first_meaningful(&[0_isize, 0]), Some(0));
    }

    #[test]
    fn floats() {
        assert_eq!(first_meaningful(&[0.0_f64, 42.0, 0.0]), Some(42.0));
        assert_eq!(first_meaningful(&[0.0_f64, 0.0]), Some(0.0));
        assert_eq!(first_meaningful(&[0.0_f32, 42.0, 0.0]), Some(42.0));
        assert_eq!(first_meaningful(&[0.0_f32, 0.0]), Some(0.0));
    }

    #[test]
    fn code_info_picks_first_identified() {
        let candidates = vec![CodeInfo::new(""), CodeInfo::new("plugin")];
        assert_eq!(first_meaningful(&candidates), Some(CodeInfo::new("plugin")));
    }

    #[test]
    fn code_info_all_unidentified_is_absent() {
        let candidates = vec![CodeInfo::new(""), CodeInfo::new("")];
        assert_eq!(first_meaningful(&candidates), None);
    }

    #[test]
    fn other_returns_first_unconditionally() {
        let picked = Candidates::Other(vec![json!(["a"]), json!(["b"])]).resolve();
        assert_eq!(picked, Some(Resolved::Other(json!(["a"]))));

        // Even an "empty looking" first value wins.
        let picked = Candidates::Other(vec![json!(""), json!("b")]).resolve();
        assert_eq!(picked, Some(Resolved::Other(json!(""))));
    }

    #[test]
    fn no_candidates_is_absent_for_every_kind() {
        assert_eq!(Candidates::Text(vec![]).resolve(), None);
        assert_eq!(Candidates::Int64(vec![]).resolve(), None);
        assert_eq!(Candidates::Int32(vec![]).resolve(), None);
        assert_eq!(Candidates::Int(vec![]).resolve(), None);
        assert_eq!(Candidates::Float64(vec![]).resolve(), None);
        assert_eq!(Candidates::Float32(vec![]).resolve(), None);
        assert_eq!(Candidates::CodeInfo(vec![]).resolve(), None);
        assert_eq!(Candidates::Other(vec![]).resolve(), None);
    }

    #[test]
    fn resolve_tags_result_with_kind() {
        assert_eq!(
            Candidates::Int32(vec![0, 7]).resolve(),
            Some(Resolved::Int32(7))
        );
        assert_eq!(
            Candidates::Text(texts(&["", ""])).resolve(),
            Some(Resolved::Text(String::new()))
        );
    }

    #[test]
    fn inputs_are_untouched() {
        let candidates = texts(&["", "x"]);
        let before = candidates.clone();
        let _ = first_meaningful(&candidates);
        assert_eq!(candidates, before);
    }

    #[test]
    fn len_and_is_empty() {
        assert!(Candidates::CodeInfo(vec![]).is_empty());
        assert_eq!(Candidates::Int(vec![1, 2, 3]).len(), 3);
    }
}
