use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    CSharp,
    Kotlin,
    Ruby,
    Rust,
    Go,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::CSharp,
        Language::Kotlin,
        Language::Ruby,
        Language::Rust,
        Language::Go,
    ];

    pub fn judge_id(self) -> i32 {
        match self {
            Language::Python => 71,
            Language::JavaScript => 63,
            Language::TypeScript => 74,
            Language::Java => 62,
            Language::Cpp => 54,
            Language::C => 50,
            Language::CSharp => 51,
            Language::Kotlin => 78,
            Language::Ruby => 72,
            Language::Rust => 73,
            Language::Go => 60,
        }
    }

    pub fn from_judge_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|language| language.judge_id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::C => "C",
            Language::CSharp => "C#",
            Language::Kotlin => "Kotlin",
            Language::Ruby => "Ruby",
            Language::Rust => "Rust",
            Language::Go => "Go",
        }
    }
}

impl TryFrom<i32> for Language {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_judge_id(value).ok_or(DomainError::UnknownLanguage(value))
    }
}
