use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serialized form matches the stored string (snake_case).
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ReportStatus {
    Uploaded => "uploaded",
    Processing => "processing",
    Extracted => "extracted",
    Explained => "explained",
    Verified => "verified",
    Rejected => "rejected",
    Edited => "edited",
    Error => "error",
});

impl ReportStatus {
    /// Whether a new pipeline run may start from this status.
    /// `processing` is excluded (another run owns the document) and the
    /// review outcomes (`verified`/`rejected`/`edited`) are frozen.
    pub fn can_start_run(&self) -> bool {
        matches!(
            self,
            Self::Uploaded | Self::Extracted | Self::Explained | Self::Error
        )
    }

    /// Whether the report is terminally processed and usable as trend history.
    pub fn is_trend_eligible(&self) -> bool {
        matches!(self, Self::Explained | Self::Verified | Self::Edited)
    }
}

str_enum!(DocumentType {
    LabReport => "lab_report",
    Prescription => "prescription",
    Advice => "advice",
});

str_enum!(FindingStatus {
    Normal => "normal",
    Low => "low",
    High => "high",
    Critical => "critical",
});

impl FindingStatus {
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

str_enum!(Severity {
    Normal => "normal",
    Attention => "attention",
    Concern => "concern",
});

str_enum!(CertaintyLevel {
    Established => "established",
    Inferred => "inferred",
});

str_enum!(QualityLabel {
    High => "high",
    Moderate => "moderate",
    Low => "low",
    VeryLow => "very_low",
});

str_enum!(FlagSeverity {
    Warning => "warning",
    Info => "info",
});

str_enum!(PersonalizationLevel {
    Simple => "simple",
    Standard => "standard",
    Detailed => "detailed",
});

str_enum!(TrendDirection {
    Rising => "rising",
    Falling => "falling",
    Stable => "stable",
});

str_enum!(TrendAssessment {
    Improving => "improving",
    Worsening => "worsening",
    Neutral => "neutral",
});

str_enum!(AnxietyLevel {
    High => "high",
    Moderate => "moderate",
    Low => "low",
});

str_enum!(SourceKind {
    Finding => "finding",
    Evidence => "evidence",
    Document => "document",
});

str_enum!(Language {
    En => "en",
    Hi => "hi",
    Te => "te",
    Ta => "ta",
    Or => "or",
    Ml => "ml",
    Bn => "bn",
    Pa => "pa",
    Mr => "mr",
});

impl Language {
    /// English name of the language, used in narrative prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Te => "Telugu",
            Self::Ta => "Tamil",
            Self::Or => "Odia",
            Self::Ml => "Malayalam",
            Self::Bn => "Bengali",
            Self::Pa => "Punjabi",
            Self::Mr => "Marathi",
        }
    }
}

/// Letter grade for an evaluation result. Kept out of `str_enum!` because the
/// stored form is uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::str::FromStr for Grade {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "F" => Ok(Self::F),
            _ => Err(StoreError::InvalidEnum {
                field: "Grade".into(),
                value: s.into(),
            }),
        }
    }
}
