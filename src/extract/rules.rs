use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::extract::overrides::{CompiledOverride, OverrideSpec};
use crate::record::EngagementType;

/// A keyword trigger: substrings match anywhere in the lowered text, tokens
/// only as standalone whitespace-delimited words.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTrigger {
    pub label: String,
    #[serde(default)]
    pub substrings: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl KeywordTrigger {
    pub fn matches(&self, text: &str, tokens: &HashSet<&str>) -> bool {
        self.substrings.iter().any(|s| text.contains(s.as_str()))
            || self.tokens.iter().any(|t| tokens.contains(t.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementTrigger {
    pub label: EngagementType,
    #[serde(default)]
    pub substrings: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl EngagementTrigger {
    pub fn matches(&self, text: &str, tokens: &HashSet<&str>) -> bool {
        self.substrings.iter().any(|s| text.contains(s.as_str()))
            || self.tokens.iter().any(|t| tokens.contains(t.as_str()))
    }
}

/// The full rule surface of the extraction engine, externalizable as JSON so
/// per-company corrections and keyword tables can be edited and tested
/// without touching the scanning logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Generic compensation words that disqualify a role-name candidate.
    pub role_stoplist: Vec<String>,
    pub role_triggers: Vec<KeywordTrigger>,
    pub engagement_triggers: Vec<EngagementTrigger>,
    /// Branch triggers for chat text.
    pub branch_triggers: Vec<KeywordTrigger>,
    /// Wider branch triggers for document text (job descriptions spell the
    /// branch names out).
    pub document_branch_triggers: Vec<KeywordTrigger>,
    pub confirmation_phrases: Vec<String>,
    pub withdrawal_keywords: Vec<String>,
    /// (filename substring, canonical company name) pairs for documents
    /// whose filenames don't contain the company name itself.
    pub filename_aliases: Vec<(String, String)>,
    /// Per-company fixed corrections, keyed by canonical company name.
    pub overrides: BTreeMap<String, OverrideSpec>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            role_stoplist: strings(&["package", "base", "bonus", "ctc", "stipend", "pay"]),
            role_triggers: vec![
                // TODO: standalone "se" and "get" tokens false-positive on
                // ordinary English ("per se", "get the form").
                trigger("Software Engineer", &["software engineer"], &["se"]),
                trigger(
                    "Digital Specialist Engineer",
                    &["digital specialist engineer"],
                    &[],
                ),
                trigger("Specialist Programmer", &["specialist programmer"], &[]),
                trigger("Junior Support Engineer", &["junior support engineer"], &[]),
                trigger(
                    "Graduate Engineer Trainee",
                    &["graduate engineer trainee"],
                    &["get"],
                ),
                trigger(
                    "System Engineer",
                    &["system engineer", "associate system engineer"],
                    &[],
                ),
            ],
            engagement_triggers: vec![
                EngagementTrigger {
                    label: EngagementType::FullTime,
                    substrings: strings(&[
                        "full time",
                        "full-time",
                        "fte",
                        "graduate engineer trainee",
                    ]),
                    tokens: strings(&["get"]),
                },
                EngagementTrigger {
                    label: EngagementType::Internship,
                    substrings: strings(&["intern"]),
                    tokens: vec![],
                },
                EngagementTrigger {
                    label: EngagementType::Ppo,
                    substrings: strings(&["ppo"]),
                    tokens: vec![],
                },
            ],
            branch_triggers: vec![
                trigger("CSE", &["cse"], &[]),
                trigger("IT", &[], &["it"]),
                trigger("ECE", &["ece"], &[]),
                trigger("EEE", &["eee"], &[]),
                trigger("ME", &["mechanical"], &[]),
                trigger("CE", &["civil"], &[]),
            ],
            document_branch_triggers: vec![
                trigger("CSE", &["computer science", "cse"], &[]),
                trigger("IT", &["information technology"], &["it"]),
                trigger("ECE", &["electronics and communication", "ece"], &[]),
                trigger("EEE", &["electrical", "eee"], &["ee"]),
                trigger("ME", &["mechanical"], &["me"]),
            ],
            confirmation_phrases: strings(&[
                "final selects",
                "selected candidates",
                "final results",
                "selected students",
            ]),
            withdrawal_keywords: strings(&["withdrawn", "cancelled"]),
            filename_aliases: vec![
                ("hackwithinfy".to_string(), "Infosys".to_string()),
                ("infy".to_string(), "Infosys".to_string()),
            ],
            overrides: OverrideSpec::builtin_table(),
        }
    }
}

impl RuleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading rule file {}", path.display()))?;
        let config: RuleConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing rule file {}", path.display()))?;
        Ok(config)
    }

    /// Compile override patterns and freeze the tables for the batch run.
    pub fn compile(self) -> Result<CompiledRules> {
        let mut overrides = BTreeMap::new();
        for (company, spec) in self.overrides {
            let compiled = spec
                .compile()
                .with_context(|| format!("compiling override rules for {}", company))?;
            overrides.insert(company, compiled);
        }
        Ok(CompiledRules {
            role_stoplist: self.role_stoplist,
            role_triggers: self.role_triggers,
            engagement_triggers: self.engagement_triggers,
            branch_triggers: self.branch_triggers,
            document_branch_triggers: self.document_branch_triggers,
            confirmation_phrases: self.confirmation_phrases,
            withdrawal_keywords: self.withdrawal_keywords,
            filename_aliases: self.filename_aliases,
            overrides,
        })
    }
}

/// Rule tables with override regexes compiled, shared read-only across the
/// per-company workers.
#[derive(Debug)]
pub struct CompiledRules {
    pub role_stoplist: Vec<String>,
    pub role_triggers: Vec<KeywordTrigger>,
    pub engagement_triggers: Vec<EngagementTrigger>,
    pub branch_triggers: Vec<KeywordTrigger>,
    pub document_branch_triggers: Vec<KeywordTrigger>,
    pub confirmation_phrases: Vec<String>,
    pub withdrawal_keywords: Vec<String>,
    pub filename_aliases: Vec<(String, String)>,
    pub overrides: BTreeMap<String, CompiledOverride>,
}

impl CompiledRules {
    pub fn builtin() -> Self {
        RuleConfig::default()
            .compile()
            .expect("built-in rule tables must compile")
    }
}

fn trigger(label: &str, substrings: &[&str], tokens: &[&str]) -> KeywordTrigger {
    KeywordTrigger {
        label: label.to_string(),
        substrings: strings(substrings),
        tokens: strings(tokens),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
