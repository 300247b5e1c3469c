use std::sync::LazyLock;

use regex::Regex;

use crate::record::OfferProfile;

static LPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*lpa").unwrap());
static LAKHS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:inr\s*)?(\d+(?:\.\d+)?)\s*lakhs\s*per\s*annum").unwrap()
});
static STIPEND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)stipend[\s\w]*[:\-]?\s*(?:inr|rs\.?)?\s*(\d{2,6})(?:/-|\s*per month|\s*pm)")
        .unwrap()
});
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{2,6})(?:/-|\s*per month|\s*pm)").unwrap());
static PROFILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z\s0-9()/\-]+?)\s*[:\-]?\s*(?:inr|rs\.?|₹)?\s*(\d+(?:\.\d+)?)\s*lpa")
        .unwrap()
});

/// Annual compensation in LPA. When a message mentions several figures the
/// last one wins; a "X lakhs per annum" phrasing is the fallback shape.
pub fn extract_lpa(text: &str) -> Option<f64> {
    if let Some(v) = last_capture(&LPA_RE, text) {
        return Some(v);
    }
    last_capture(&LAKHS_RE, text)
}

/// Every LPA-style figure in order of appearance. The enrichment pass
/// filters these to a plausible window before taking the maximum.
pub fn all_lpa_mentions(text: &str) -> Vec<f64> {
    LPA_RE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect()
}

/// Monthly stipend. The primary shape anchors on the "stipend" keyword; the
/// fallback keeps only the amount-with-suffix shape. Last occurrence wins.
/// Plausibility (>= 1000) is the caller's concern, not this function's.
pub fn extract_stipend(text: &str) -> Option<f64> {
    if let Some(v) = last_capture(&STIPEND_RE, text) {
        return Some(v);
    }
    last_capture(&AMOUNT_RE, text)
}

/// (role, ctc) pairs, scanned line by line: a pair must sit within a single
/// line. Candidates are trimmed of surrounding markup and rejected when too
/// short or when they contain a generic compensation word from `stoplist`
/// (those matches captured a descriptor, not a role title).
pub fn extract_role_profiles(text: &str, stoplist: &[String]) -> Vec<OfferProfile> {
    let mut profiles = Vec::new();
    for line in text.lines() {
        for caps in PROFILE_RE.captures_iter(line) {
            let role = caps[1]
                .trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace())
                .to_string();
            let Ok(ctc) = caps[2].parse::<f64>() else {
                continue;
            };
            if role.chars().count() <= 3 {
                continue;
            }
            let lower = role.to_lowercase();
            if stoplist.iter().any(|w| lower.contains(w.as_str())) {
                continue;
            }
            profiles.push(OfferProfile { role, ctc_lpa: ctc });
        }
    }
    profiles
}

fn last_capture(re: &Regex, text: &str) -> Option<f64> {
    re.captures_iter(text)
        .last()
        .and_then(|c| c[1].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stoplist() -> Vec<String> {
        ["package", "base", "bonus", "ctc", "stipend", "pay"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn last_lpa_mention_wins() {
        let text = "CTC is 12 LPA and later revised to 15 LPA";
        assert_eq!(extract_lpa(text), Some(15.0));
    }

    #[test]
    fn lpa_is_case_insensitive_with_decimals() {
        assert_eq!(extract_lpa("offer of 7.5 lpa confirmed"), Some(7.5));
    }

    #[test]
    fn lakhs_per_annum_fallback() {
        assert_eq!(extract_lpa("package is INR 12 lakhs per annum"), Some(12.0));
        assert_eq!(extract_lpa("package is 8 lakhs per annum"), Some(8.0));
    }

    #[test]
    fn no_mention_yields_none() {
        assert_eq!(extract_lpa("drive scheduled for Monday"), None);
    }

    #[test]
    fn stipend_with_keyword() {
        assert_eq!(extract_stipend("stipend: 15000/-"), Some(15000.0));
        assert_eq!(extract_stipend("Stipend - Rs. 25000 per month"), Some(25000.0));
    }

    #[test]
    fn stipend_fallback_without_keyword() {
        assert_eq!(extract_stipend("interns receive 12000 pm"), Some(12000.0));
    }

    #[test]
    fn stipend_returns_implausible_value_unfiltered() {
        // The plausibility guard lives in the aggregator, not here.
        assert_eq!(extract_stipend("stipend: 500/-"), Some(500.0));
    }

    #[test]
    fn stipend_last_occurrence_wins() {
        let text = "stipend: 10000/- revised to stipend: 20000/-";
        assert_eq!(extract_stipend(text), Some(20000.0));
    }

    #[test]
    fn profile_with_colon_separator() {
        let p = extract_role_profiles("Software Engineer: 5 LPA", &stoplist());
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].role, "Software Engineer");
        assert_eq!(p[0].ctc_lpa, 5.0);
    }

    #[test]
    fn profile_with_currency_marker() {
        let p = extract_role_profiles(
            "Specialist Programmer L3 (Trainee): ₹21 LPA",
            &stoplist(),
        );
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].role, "Specialist Programmer L3 (Trainee)");
        assert_eq!(p[0].ctc_lpa, 21.0);
    }

    #[test]
    fn profile_requires_single_line() {
        let p = extract_role_profiles("Software Engineer\n5 LPA", &stoplist());
        assert!(p.is_empty());
    }

    #[test]
    fn stoplist_words_rejected() {
        assert!(extract_role_profiles("Total package: 10 LPA", &stoplist()).is_empty());
        assert!(extract_role_profiles("base pay - 6 LPA", &stoplist()).is_empty());
    }

    #[test]
    fn short_candidates_rejected() {
        assert!(extract_role_profiles("ctc 5 LPA", &stoplist()).is_empty());
        assert!(extract_role_profiles("up 5 LPA", &stoplist()).is_empty());
    }

    #[test]
    fn multiple_profiles_on_separate_lines() {
        let text = "Systems Engineer: 3.6 LPA\nDigital Specialist Engineer - 6.25 LPA";
        let p = extract_role_profiles(text, &stoplist());
        assert_eq!(p.len(), 2);
        assert_eq!(p[1].ctc_lpa, 6.25);
    }
}
