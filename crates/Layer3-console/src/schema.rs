//! Command Schema - 파라미터 이름과 허용 값 집합
//!
//! 값 집합은 정적(레지스트리 하이브, 해시 포맷, DCOM 메서드 ...)이거나
//! 세션 상태에서 계산되는 동적 집합(런처, 데이터 파일, 태스크 이름 ...)이다.
//! `Static`/`Dynamic` 집합만 검증에 쓰이고 나머지는 자동완성 힌트다.

use elite_foundation::{Error, Result};

// ============================================================================
// Static value sets
// ============================================================================

pub const REGISTRY_HIVES: &[&str] = &[
    "HKEY_CURRENT_USER\\",
    "HKEY_LOCAL_MACHINE\\",
    "HKEY_CLASSES_ROOT\\",
    "HKEY_CURRENT_CONFIG\\",
];

pub const HASH_FORMATS: &[&str] = &["hashcat", "john"];

pub const DCOM_METHODS: &[&str] = &[
    "mmc20.application",
    "mmc20_application",
    "shellwindows",
    "shellbrowserwindow",
    "exceldde",
];

pub const BOOLEANS: &[&str] = &["true", "false"];

pub const SET_OPTIONS: &[&str] = &["Delay", "JitterPercent", "ConnectAttempts"];

// ============================================================================
// Parameter
// ============================================================================

/// Session state a dynamic value set is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    ChildAgents,
    Launchers,
    DataFiles,
    TaskNames,
}

/// Allowed values of a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValues {
    /// Any text
    FreeText,
    /// Fixed set, matched case-insensitively
    Static(&'static [&'static str]),
    /// Prefix suggestions only; any text is accepted
    Hints(&'static [&'static str]),
    /// Computed from session state when the command runs
    Dynamic(ValueSource),
    /// Computed like `Dynamic`, offered for completion only
    Suggested(ValueSource),
}

/// Resolves dynamic value sets
pub trait ValueProvider {
    fn values(&self, source: ValueSource) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub values: ParameterValues,
    pub optional: bool,
}

impl Parameter {
    pub fn text(name: &'static str) -> Self {
        Self {
            name,
            values: ParameterValues::FreeText,
            optional: false,
        }
    }

    pub fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            name,
            values: ParameterValues::Static(values),
            optional: false,
        }
    }

    pub fn hints(name: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            name,
            values: ParameterValues::Hints(values),
            optional: false,
        }
    }

    pub fn dynamic(name: &'static str, source: ValueSource) -> Self {
        Self {
            name,
            values: ParameterValues::Dynamic(source),
            optional: false,
        }
    }

    pub fn suggested(name: &'static str, source: ValueSource) -> Self {
        Self {
            name,
            values: ParameterValues::Suggested(source),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Candidate values for this parameter (empty for free text)
    pub fn candidates(&self, provider: &dyn ValueProvider) -> Vec<String> {
        match &self.values {
            ParameterValues::FreeText => Vec::new(),
            ParameterValues::Static(values) | ParameterValues::Hints(values) => {
                values.iter().map(|v| v.to_string()).collect()
            }
            ParameterValues::Dynamic(source) | ParameterValues::Suggested(source) => {
                provider.values(*source)
            }
        }
    }

    /// Completion suggestions starting with `prefix` (case-insensitive)
    pub fn suggestions(&self, prefix: &str, provider: &dyn ValueProvider) -> Vec<String> {
        let prefix = prefix.to_ascii_lowercase();
        self.candidates(provider)
            .into_iter()
            .filter(|c| c.to_ascii_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Canonical spelling of `value`. Only `Static` and `Dynamic` sets
    /// reject anything; the rest pass the value through unchanged.
    pub fn validate(&self, value: &str, provider: &dyn ValueProvider) -> Result<String> {
        match &self.values {
            ParameterValues::Static(_) | ParameterValues::Dynamic(_) => {
                let candidates = self.candidates(provider);
                matching(&candidates, value).ok_or_else(|| {
                    Error::Validation(format!(
                        "Invalid {}: \"{}\" specified. Valid values: {}",
                        self.name,
                        value,
                        candidates.join(",")
                    ))
                })
            }
            _ => Ok(value.to_string()),
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.optional {
            write!(f, "[{}]", self.name)
        } else {
            write!(f, "<{}>", self.name)
        }
    }
}

/// Case-insensitive lookup; returns the canonical spelling.
pub fn matching<S: AsRef<str>>(choices: &[S], value: &str) -> Option<String> {
    choices
        .iter()
        .map(|c| c.as_ref())
        .find(|c| c.eq_ignore_ascii_case(value))
        .map(|c| c.to_string())
}

// ============================================================================
// Arity
// ============================================================================

/// Argument-count bounds, not counting the command name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ValueProvider for Fixed {
        fn values(&self, source: ValueSource) -> Vec<String> {
            match source {
                ValueSource::Launchers => vec!["PowerShell".into(), "MSBuild".into()],
                _ => Vec::new(),
            }
        }
    }

    #[test]
    fn test_static_choice_is_case_insensitive() {
        let param = Parameter::choice("HashFormat", HASH_FORMATS);
        assert_eq!(param.validate("JOHN", &Fixed).unwrap(), "john");
        match param.validate("rainbow", &Fixed) {
            Err(Error::Validation(msg)) => assert_eq!(
                msg,
                "Invalid HashFormat: \"rainbow\" specified. Valid values: hashcat,john"
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(matching(HASH_FORMATS, "Hashcat").as_deref(), Some("hashcat"));
    }

    #[test]
    fn test_hints_accept_any_path() {
        let param = Parameter::hints("RegPath", REGISTRY_HIVES);
        assert_eq!(
            param.validate("HKLM\\Software", &Fixed).unwrap(),
            "HKLM\\Software"
        );
        assert_eq!(
            param.suggestions("hkey_l", &Fixed),
            vec!["HKEY_LOCAL_MACHINE\\".to_string()]
        );
    }

    #[test]
    fn test_dynamic_values() {
        let param = Parameter::dynamic("Launcher", ValueSource::Launchers);
        assert_eq!(param.validate("msbuild", &Fixed).unwrap(), "MSBuild");
        assert!(matches!(
            param.validate("Regsvr32", &Fixed),
            Err(Error::Validation(_))
        ));
        assert_eq!(param.suggestions("p", &Fixed), vec!["PowerShell".to_string()]);
    }

    #[test]
    fn test_suggested_values_are_not_enforced() {
        let param = Parameter::suggested("LocalFilePath", ValueSource::Launchers);
        assert_eq!(param.validate("tools/x.exe", &Fixed).unwrap(), "tools/x.exe");
        assert_eq!(param.suggestions("m", &Fixed), vec!["MSBuild".to_string()]);
    }

    #[test]
    fn test_arity() {
        assert!(Arity::exactly(0).allows(0));
        assert!(!Arity::exactly(0).allows(1));
        assert!(Arity::range(3, 4).allows(4));
        assert!(!Arity::range(3, 4).allows(2));
        assert!(Arity::at_least(1).allows(99));
        assert_eq!(Parameter::text("Path").optional().to_string(), "[Path]");
    }
}
