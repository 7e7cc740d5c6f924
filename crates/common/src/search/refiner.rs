//! Location refinement over retrieved candidates

use super::model::Candidate;

/// Keep candidates whose English city or district contains any of `terms`,
/// case-insensitively. An empty term list keeps everything. Order is
/// preserved.
pub fn refine_by_location(candidates: Vec<Candidate>, terms: &[String]) -> Vec<Candidate> {
    let needles: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if needles.is_empty() {
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|c| {
            let city = c.city.as_deref().unwrap_or_default().to_lowercase();
            let district = c.district.as_deref().unwrap_or_default().to_lowercase();
            needles
                .iter()
                .any(|n| city.contains(n.as_str()) || district.contains(n.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_support::candidate_in;

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.localized_name(Default::default())).collect()
    }

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_terms_keep_everything() {
        let input = vec![
            candidate_in("A", 1, "New Cairo", None),
            candidate_in("B", 2, "Sheikh Zayed", None),
        ];
        let refined = refine_by_location(input.clone(), &[]);
        assert_eq!(refined, input);
    }

    #[test]
    fn test_case_insensitive_substring_on_city_or_district() {
        let input = vec![
            candidate_in("Eastown", 1, "New Cairo", Some("Fifth Settlement")),
            candidate_in("Allegria", 2, "Sheikh Zayed", None),
            candidate_in("Mivida", 3, "Cairo", Some("Fifth Settlement")),
            candidate_in("Marassi", 4, "North Coast", Some("Sidi Abdel Rahman")),
        ];

        assert_eq!(names(&refine_by_location(input.clone(), &terms(&["new cairo"]))), vec!["Eastown"]);
        assert_eq!(
            names(&refine_by_location(input.clone(), &terms(&["SETTLEMENT"]))),
            vec!["Eastown", "Mivida"]
        );
        assert_eq!(
            names(&refine_by_location(input, &terms(&["zayed", "coast"]))),
            vec!["Allegria", "Marassi"]
        );
    }

    #[test]
    fn test_partial_phrase_matches_longer_field() {
        let input = vec![
            candidate_in("Lake View", 1, "new cairo district", None),
            candidate_in("Corniche", 2, "Alexandria", Some("Downtown")),
            candidate_in("Hyde Park", 3, "Cairo", Some("Fifth Settlement, New Cairo")),
        ];

        let refined = refine_by_location(input, &terms(&["New Cairo"]));
        assert_eq!(names(&refined), vec!["Lake View", "Hyde Park"]);
    }

    #[test]
    fn test_missing_location_fields_never_match() {
        let mut bare = candidate_in("Nowhere", 1, "", None);
        bare.city = None;

        let refined = refine_by_location(vec![bare], &terms(&["cairo"]));
        assert!(refined.is_empty());
    }

    #[test]
    fn test_no_match_yields_empty_and_order_kept() {
        let input = vec![
            candidate_in("C", 3, "Giza", None),
            candidate_in("A", 1, "Giza", None),
            candidate_in("B", 2, "Alexandria", None),
        ];

        assert!(refine_by_location(input.clone(), &terms(&["Hurghada"])).is_empty());
        assert_eq!(names(&refine_by_location(input, &terms(&["giza"]))), vec!["C", "A"]);
    }

    #[test]
    fn test_arabic_terms_do_not_match_english_fields() {
        let input = vec![candidate_in("Eastown", 1, "New Cairo", None)];
        assert!(refine_by_location(input, &terms(&["القاهرة"])).is_empty());
    }
}
