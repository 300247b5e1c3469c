//! Per-message field accumulation. Each field has one trigger and one
//! accumulation policy, applied independently per message:
//!
//! | field                 | trigger                      | policy      |
//! |-----------------------|------------------------------|-------------|
//! | is_withdrawn          | withdrawal keyword           | sticky-true |
//! | is_result_confirmed   | confirmation phrase          | sticky-true |
//! | students_selected     | `selection <N>`              | sum         |
//! | students_shortlisted  | `<N> shortlisted`            | last-wins   |
//! | ctc_lpa               | LPA patterns                 | last-wins   |
//! | base_lpa / bonus_lpa  | keyword + LPA                | last-wins   |
//! | stipend_monthly       | stipend patterns, >= 1000    | last-wins   |
//! | engagement_types      | engagement trigger table     | set-union   |
//! | roles                 | role trigger table           | set-union   |
//! | cgpa_cutoff           | `<N> cgpa`                   | last-wins   |
//! | allowed_branches      | branch trigger table         | set-union   |

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::extract::patterns;
use crate::extract::rules::CompiledRules;
use crate::record::CompanyRecord;

static SELECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"selection\s+(\d+)").unwrap());
static SHORTLIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+shortlisted").unwrap());
static CGPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*cgpa").unwrap());
static BASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"base\s*(?:package)?\s*[:\-]?\s*(?:inr|rs\.?)?\s*(\d+(?:\.\d+)?)\s*lpa").unwrap()
});
static BONUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bonus\s*[:\-]?\s*(?:inr|rs\.?)?\s*(\d+(?:\.\d+)?)\s*lpa").unwrap()
});

/// Minimum believable monthly stipend; smaller figures are far more likely
/// percentages or counts that happened to carry a stipend-like suffix.
const MIN_PLAUSIBLE_STIPEND: f64 = 1000.0;

/// Fold one message into the record. The text is lowered for matching; the
/// caller stores the original form.
pub fn apply_message(record: &mut CompanyRecord, msg: &str, rules: &CompiledRules) {
    let text = msg.to_lowercase();
    let tokens: HashSet<&str> = text.split_whitespace().collect();

    // Sticky flags: false -> true only.
    if rules.withdrawal_keywords.iter().any(|k| text.contains(k.as_str())) {
        record.flags.is_withdrawn = true;
    }
    if rules.confirmation_phrases.iter().any(|p| text.contains(p.as_str())) {
        record.flags.is_result_confirmed = true;
    }

    // Selection counts sum across every matching message.
    let selected: Vec<u32> = SELECTION_RE
        .captures_iter(&text)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    if !selected.is_empty() {
        let prior = record.selection_stats.students_selected.unwrap_or(0);
        record.selection_stats.students_selected =
            Some(prior + selected.iter().sum::<u32>());
    }

    // Shortlist counts: the most recent mention wins outright.
    if let Some(n) = last_u32(&SHORTLIST_RE, &text) {
        record.selection_stats.students_shortlisted = Some(n);
    }

    if let Some(ctc) = patterns::extract_lpa(msg) {
        record.compensation.ctc_lpa = Some(ctc);
    }
    if let Some(stipend) = patterns::extract_stipend(msg) {
        if stipend >= MIN_PLAUSIBLE_STIPEND {
            record.compensation.stipend_monthly = Some(stipend);
        }
    }
    if let Some(base) = last_f64(&BASE_RE, &text) {
        record.compensation.base_lpa = Some(base);
    }
    if let Some(bonus) = last_f64(&BONUS_RE, &text) {
        record.compensation.bonus_lpa = Some(bonus);
    }

    for t in &rules.engagement_triggers {
        if t.matches(&text, &tokens) {
            record.engagement_types.insert(t.label);
        }
    }
    for t in &rules.role_triggers {
        if t.matches(&text, &tokens) {
            record.roles.insert(t.label.clone());
        }
    }
    for t in &rules.branch_triggers {
        if t.matches(&text, &tokens) {
            record.eligibility.allowed_branches.insert(t.label.clone());
        }
    }

    if let Some(cgpa) = last_f64(&CGPA_RE, &text) {
        record.eligibility.cgpa_cutoff = Some(cgpa);
    }
}

fn last_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text).last().and_then(|c| c[1].parse().ok())
}

fn last_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures_iter(text).last().and_then(|c| c[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EngagementType;

    fn run(messages: &[&str]) -> CompanyRecord {
        let rules = CompiledRules::builtin();
        let mut record = CompanyRecord::new("Acme");
        for msg in messages {
            apply_message(&mut record, msg, &rules);
        }
        record
    }

    #[test]
    fn withdrawn_is_sticky() {
        let r = run(&["drive withdrawn due to low turnout", "fresh drive announced"]);
        assert!(r.flags.is_withdrawn);
    }

    #[test]
    fn confirmation_is_sticky_across_silent_messages() {
        let r = run(&["test on monday", "final results declared", "hall allotment posted"]);
        assert!(r.flags.is_result_confirmed);
    }

    #[test]
    fn selection_sums_and_shortlist_takes_last() {
        let r = run(&["selection 10", "selection 5", "12 shortlisted", "8 shortlisted"]);
        assert_eq!(r.selection_stats.students_selected, Some(15));
        assert_eq!(r.selection_stats.students_shortlisted, Some(8));
    }

    #[test]
    fn ctc_last_message_wins() {
        let r = run(&["offer at 10 LPA", "revised offer at 12 LPA"]);
        assert_eq!(r.compensation.ctc_lpa, Some(12.0));
    }

    #[test]
    fn base_and_bonus_extracted_independently() {
        let r = run(&["base package: 6 lpa with bonus: 1.5 lpa"]);
        assert_eq!(r.compensation.base_lpa, Some(6.0));
        assert_eq!(r.compensation.bonus_lpa, Some(1.5));
    }

    #[test]
    fn implausible_stipend_discarded() {
        let r = run(&["stipend: 500/-"]);
        assert_eq!(r.compensation.stipend_monthly, None);
        let r = run(&["stipend: 15000/-"]);
        assert_eq!(r.compensation.stipend_monthly, Some(15000.0));
    }

    #[test]
    fn implausible_stipend_does_not_clear_earlier_value() {
        let r = run(&["stipend: 15000/-", "stipend: 500/-"]);
        assert_eq!(r.compensation.stipend_monthly, Some(15000.0));
    }

    #[test]
    fn engagement_types_union() {
        let r = run(&["full time role", "internship with ppo chance"]);
        assert!(r.engagement_types.contains(&EngagementType::FullTime));
        assert!(r.engagement_types.contains(&EngagementType::Internship));
        assert!(r.engagement_types.contains(&EngagementType::Ppo));
    }

    #[test]
    fn role_keywords_union() {
        let r = run(&["software engineer openings", "specialist programmer round 2"]);
        assert!(r.roles.contains("Software Engineer"));
        assert!(r.roles.contains("Specialist Programmer"));
    }

    #[test]
    fn se_token_triggers_only_standalone() {
        let r = run(&["se interview list posted"]);
        assert!(r.roles.contains("Software Engineer"));
        let r = run(&["self-nomination form posted"]);
        assert!(!r.roles.contains("Software Engineer"));
    }

    #[test]
    fn get_token_triggers_only_standalone() {
        let r = run(&["get offer letters by friday"]);
        assert!(r.engagement_types.contains(&EngagementType::FullTime));
        let r = run(&["do not forget the form"]);
        assert!(r.engagement_types.is_empty());
    }

    #[test]
    fn cgpa_last_wins() {
        let r = run(&["cutoff 7 cgpa", "relaxed to 6.5 cgpa"]);
        assert_eq!(r.eligibility.cgpa_cutoff, Some(6.5));
    }

    #[test]
    fn branches_union() {
        let r = run(&["open for cse and ece", "also it branch eligible"]);
        assert!(r.eligibility.allowed_branches.contains("CSE"));
        assert!(r.eligibility.allowed_branches.contains("ECE"));
        assert!(r.eligibility.allowed_branches.contains("IT"));
    }

    #[test]
    fn one_message_may_touch_many_fields() {
        let r = run(&["Selected candidates: Software Engineer - 5 LPA, full time, cse only"]);
        assert!(r.flags.is_result_confirmed);
        assert_eq!(r.compensation.ctc_lpa, Some(5.0));
        assert!(r.roles.contains("Software Engineer"));
        assert!(r.engagement_types.contains(&EngagementType::FullTime));
        assert!(r.eligibility.allowed_branches.contains("CSE"));
    }

    #[test]
    fn empty_contribution_is_fine() {
        let r = run(&["good luck everyone"]);
        assert!(r.compensation.ctc_lpa.is_none());
        assert!(r.roles.is_empty());
    }
}
