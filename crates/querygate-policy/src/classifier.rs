//! Lexical statement classification.
//!
//! The verb is the first whitespace-delimited token, uppercased. No grammar
//! is applied: `"FOO bar"` classifies as `FOO`, and whether the backend can
//! actually run it is decided at execution time.

use querygate_core::CommandVerb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("statement is empty")]
    EmptyStatement,
}

/// Derive the command verb of `statement`.
pub fn classify(statement: &str) -> Result<CommandVerb, ClassifyError> {
    statement
        .split_whitespace()
        .next()
        .map(CommandVerb::from_token)
        .ok_or(ClassifyError::EmptyStatement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("select * from t"), Ok(CommandVerb::Select));
        assert_eq!(classify("SELECT * FROM t"), Ok(CommandVerb::Select));
        assert_eq!(classify("SeLeCt 1"), Ok(CommandVerb::Select));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(classify("  \n\tdrop table t  "), Ok(CommandVerb::Drop));
        assert_eq!(classify("CREATE\nTABLE t (id int)"), Ok(CommandVerb::Create));
        assert_eq!(classify("DELETE"), Ok(CommandVerb::Delete));
    }

    #[test]
    fn test_unknown_words_are_still_verbs() {
        assert_eq!(
            classify("frobnicate the widgets"),
            Ok(CommandVerb::Other("FROBNICATE".to_string()))
        );
        assert_eq!(
            classify("with x as (select 1) select * from x"),
            Ok(CommandVerb::Other("WITH".to_string()))
        );
    }

    #[test]
    fn test_punctuation_stays_attached_to_token() {
        assert_eq!(
            classify("select;"),
            Ok(CommandVerb::Other("SELECT;".to_string()))
        );
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(classify(""), Err(ClassifyError::EmptyStatement));
        assert_eq!(classify("   \n\t "), Err(ClassifyError::EmptyStatement));
    }
}
