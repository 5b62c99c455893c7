// src/compiler/options.rs
//! Code generator configuration

use crate::CompilationError;
use serde::{Deserialize, Serialize};

/// How ordering and equality operators are lowered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Standard order of terms: `@>=`, `@>`, `@=<`, `@<`, `==`, `\==`
    #[default]
    Standard,
    /// Arithmetic comparison, evaluating both sides: `>=`, `>`, `=<`, `<`, `=:=`, `=\=`
    Arithmetic,
}

impl ComparisonMode {
    /// Target functor for a comparison operator, `None` for anything else
    pub fn map(self, op: &str) -> Option<&'static str> {
        let mapped = match (self, op) {
            (ComparisonMode::Standard, ">=") => "@>=",
            (ComparisonMode::Standard, ">") => "@>",
            (ComparisonMode::Standard, "<=") => "@=<",
            (ComparisonMode::Standard, "<") => "@<",
            (ComparisonMode::Standard, "==") => "==",
            (ComparisonMode::Standard, "!=") => "\\==",
            (ComparisonMode::Arithmetic, ">=") => ">=",
            (ComparisonMode::Arithmetic, ">") => ">",
            (ComparisonMode::Arithmetic, "<=") => "=<",
            (ComparisonMode::Arithmetic, "<") => "<",
            (ComparisonMode::Arithmetic, "==") => "=:=",
            (ComparisonMode::Arithmetic, "!=") => "=\\=",
            _ => return None,
        };
        Some(mapped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorOptions {
    pub comparison: ComparisonMode,

    /// Prefix of generated object symbols (`o_1`, `o_2`, ...)
    pub object_prefix: String,

    /// Prefix of fresh variables introduced by field access (`V_3`, ...)
    pub variable_prefix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            comparison: ComparisonMode::Standard,
            object_prefix: "o_".to_string(),
            variable_prefix: "V_".to_string(),
        }
    }
}

impl GeneratorOptions {
    /// Load options from JSON; missing keys take their defaults
    ///
    /// ```rust
    /// use rulelog::{ComparisonMode, GeneratorOptions};
    ///
    /// let options = GeneratorOptions::from_json(r#"{ "comparison": "arithmetic" }"#).unwrap();
    /// assert_eq!(options.comparison, ComparisonMode::Arithmetic);
    /// assert_eq!(options.object_prefix, "o_");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, CompilationError> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| CompilationError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Prefixes must keep generated names inside the target's naming rules:
    /// symbols are atoms, fresh variables are variables.
    pub fn validate(&self) -> Result<(), CompilationError> {
        let word = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        match self.object_prefix.chars().next() {
            Some(c) if c.is_ascii_lowercase() && word(&self.object_prefix) => {}
            _ => {
                return Err(CompilationError::Config(format!(
                    "object prefix '{}' must start with a lowercase letter",
                    self.object_prefix
                )));
            }
        }

        match self.variable_prefix.chars().next() {
            Some(c) if (c.is_ascii_uppercase() || c == '_') && word(&self.variable_prefix) => {}
            _ => {
                return Err(CompilationError::Config(format!(
                    "variable prefix '{}' must start with an uppercase letter or '_'",
                    self.variable_prefix
                )));
            }
        }

        Ok(())
    }
}
