pub mod aggregate;
pub mod overrides;
pub mod patterns;
pub mod rules;

use std::collections::HashSet;

use crate::normalize;
use crate::record::{CompanyRecord, OfferProfile};
use self::rules::CompiledRules;

/// Four-pass pipeline for one company: normalize + aggregate each message in
/// order, extract (role, ctc) profiles from the combined text, apply the
/// company's override entry if one exists, dedupe the profiles.
///
/// Returns `None` when no message survives normalization; companies without
/// text produce no record.
pub fn build_record(
    name: &str,
    messages: &[String],
    rules: &CompiledRules,
) -> Option<CompanyRecord> {
    let mut record = CompanyRecord::new(name);

    for raw in messages {
        let msg = normalize::clean_message(raw);
        if msg.is_empty() {
            continue;
        }
        aggregate::apply_message(&mut record, &msg, rules);
        record.metadata.raw_messages.push(msg);
    }
    if record.metadata.raw_messages.is_empty() {
        return None;
    }

    let combined = record.metadata.raw_messages.join("\n");
    record.offer_profiles = patterns::extract_role_profiles(&combined, &rules.role_stoplist);

    if let Some(entry) = rules.overrides.get(name) {
        entry.apply(&mut record, &combined);
    }

    record.offer_profiles = dedupe_profiles(std::mem::take(&mut record.offer_profiles));
    Some(record)
}

/// Collapse duplicate profiles by case-insensitive role identity. First
/// occurrence wins; later duplicates are dropped, never merged or compared
/// for a higher value.
pub fn dedupe_profiles(profiles: Vec<OfferProfile>) -> Vec<OfferProfile> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(profiles.len());
    for p in profiles {
        if seen.insert(p.role.to_lowercase()) {
            unique.push(p);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(name: &str, messages: &[&str]) -> Option<CompanyRecord> {
        let rules = CompiledRules::builtin();
        let msgs: Vec<String> = messages.iter().map(|m| m.to_string()).collect();
        build_record(name, &msgs, &rules)
    }

    #[test]
    fn acme_end_to_end() {
        let r = build(
            "Acme",
            &[
                "Selected candidates: Software Engineer - 5 LPA",
                "selection 20",
                "10 shortlisted",
            ],
        )
        .unwrap();

        assert_eq!(r.offer_profiles.len(), 1);
        assert_eq!(r.offer_profiles[0].role, "Software Engineer");
        assert_eq!(r.offer_profiles[0].ctc_lpa, 5.0);
        assert_eq!(r.selection_stats.students_selected, Some(20));
        assert_eq!(r.selection_stats.students_shortlisted, Some(10));
        assert!(r.flags.is_result_confirmed);
        assert_eq!(r.metadata.raw_messages.len(), 3);
    }

    #[test]
    fn dedupe_is_case_insensitive_first_wins() {
        let profiles = vec![
            OfferProfile { role: "Software Engineer".into(), ctc_lpa: 5.0 },
            OfferProfile { role: "software engineer".into(), ctc_lpa: 7.0 },
            OfferProfile { role: "Data Analyst".into(), ctc_lpa: 6.0 },
        ];
        let unique = dedupe_profiles(profiles);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].role, "Software Engineer");
        assert_eq!(unique[0].ctc_lpa, 5.0);
        assert_eq!(unique[1].role, "Data Analyst");
    }

    #[test]
    fn cross_message_profiles_dedupe_keeps_first_casing() {
        let r = build(
            "Acme",
            &["Software Engineer: 5 LPA", "software engineer - 5 LPA"],
        )
        .unwrap();
        assert_eq!(r.offer_profiles.len(), 1);
        assert_eq!(r.offer_profiles[0].role, "Software Engineer");
    }

    #[test]
    fn no_messages_no_record() {
        assert!(build("Ghost", &[]).is_none());
        assert!(build("Ghost", &["   ", ""]).is_none());
    }

    #[test]
    fn messages_are_normalized_before_storage() {
        let r = build(
            "Acme",
            &["27/09/25, 3:28 pm - +91 98043 64389: Acme offer 4 LPA"],
        )
        .unwrap();
        assert_eq!(r.metadata.raw_messages, vec!["Acme offer 4 LPA".to_string()]);
        assert_eq!(r.compensation.ctc_lpa, Some(4.0));
    }

    #[test]
    fn override_company_replaces_generic_profiles() {
        let r = build(
            "Infosys",
            &[
                "Random Chatter Role: 99 LPA",
                "Specialist Programmer L3 shortlist out",
            ],
        )
        .unwrap();
        assert_eq!(r.offer_profiles.len(), 1);
        assert_eq!(r.offer_profiles[0].role, "Specialist Programmer L3 (Trainee)");
        assert_eq!(r.compensation.ctc_lpa, Some(21.0));
    }

    #[test]
    fn non_override_company_keeps_generic_profiles() {
        let r = build("Acme", &["Data Analyst: 6 LPA"]).unwrap();
        assert_eq!(r.offer_profiles.len(), 1);
        assert_eq!(r.offer_profiles[0].role, "Data Analyst");
    }

    #[test]
    fn withdrawn_never_resets() {
        let r = build(
            "Acme",
            &["drive cancelled", "drive rescheduled", "venue shared"],
        )
        .unwrap();
        assert!(r.flags.is_withdrawn);
    }
}
