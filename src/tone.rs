//! Reading-level tone the generative reply is asked to adopt.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Child,
    Teen,
    Adult,
    Professional,
    Technical,
}

impl Tone {
    /// Instruction appended to the persona system prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Child => {
                "Use very simple language, short sentences and everyday examples a \
                 7-year-old could follow."
            }
            Self::Teen => {
                "Explain things as you would to a 14-year-old. Be clear and concrete \
                 and avoid jargon."
            }
            Self::Adult => {
                "Use plain English suitable for an average adult. Assume no special knowledge."
            }
            Self::Professional => {
                "Use financial terminology and industry language for a professional audience."
            }
            Self::Technical => {
                "Go into technical depth with the precision expected by an expert. Do not simplify."
            }
        }
    }

    /// Parse the loose value sent by the web client. Blank or unknown
    /// values mean "no tone instruction".
    pub fn from_request(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.trim().parse().ok())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "7" | "child" => Ok(Self::Child),
            "14" | "teen" => Ok(Self::Teen),
            "adult" => Ok(Self::Adult),
            "pro" | "professional" => Ok(Self::Professional),
            "genius" | "technical" => Ok(Self::Technical),
            other => Err(format!("unknown tone: {other}")),
        }
    }
}
