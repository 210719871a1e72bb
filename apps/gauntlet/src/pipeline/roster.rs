//! Reviewer roster and combo enumeration.

/// Separates one reviewer slot from the next in a combo label.
pub const SLOT_SEPARATOR: &str = "__";

/// One reviewer identity. `short` is the code used in combo labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    pub id: String,
    pub short: String,
}

impl Reviewer {
    pub fn new(id: &str, short: &str) -> Self {
        Self {
            id: id.to_string(),
            short: short.to_string(),
        }
    }

    /// `dr_silas_vane` → `DR SILAS VANE`
    pub fn display_name(&self) -> String {
        self.id.replace('_', " ").to_uppercase()
    }
}

/// One variant index per reviewer slot, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combo(Vec<u32>);

impl Combo {
    pub fn new(variants: Vec<u32>) -> Self {
        Self(variants)
    }

    /// Pairs each reviewer with the variant this combo selects for it.
    pub fn picks<'r>(&self, reviewers: &'r [Reviewer]) -> Vec<(&'r Reviewer, u32)> {
        reviewers.iter().zip(self.0.iter().copied()).collect()
    }

    /// `silas_1__amara_2__julian_3`
    pub fn label(&self, reviewers: &[Reviewer]) -> String {
        self.picks(reviewers)
            .into_iter()
            .map(|(reviewer, variant)| format!("{}_{}", reviewer.short, variant))
            .collect::<Vec<_>>()
            .join(SLOT_SEPARATOR)
    }
}

/// Every combo of `variants` choices over `slots` reviewer slots.
///
/// Order: first slot varies slowest; within a slot, ascending variant index.
pub fn enumerate_combos(slots: usize, variants: u32) -> Vec<Combo> {
    cartesian_product(slots, variants)
        .into_iter()
        .map(Combo::new)
        .collect()
}

fn cartesian_product(slots: usize, variants: u32) -> Vec<Vec<u32>> {
    if slots == 0 {
        return vec![vec![]];
    }

    let rest = cartesian_product(slots - 1, variants);

    (1..=variants)
        .flat_map(|v| {
            rest.iter().map(move |suffix| {
                let mut combo = Vec::with_capacity(suffix.len() + 1);
                combo.push(v);
                combo.extend(suffix);
                combo
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn abc() -> Vec<Reviewer> {
        vec![
            Reviewer::new("alice", "a"),
            Reviewer::new("bob", "b"),
            Reviewer::new("carol", "c"),
        ]
    }

    #[test]
    fn test_label_grammar() {
        let reviewers = abc();
        assert_eq!(Combo::new(vec![1, 2, 3]).label(&reviewers), "a_1__b_2__c_3");
    }

    #[test]
    fn test_enumerates_every_combo_once() {
        let reviewers = abc();
        let combos = enumerate_combos(3, 3);
        assert_eq!(combos.len(), 27);

        let labels: Vec<String> = combos.iter().map(|c| c.label(&reviewers)).collect();
        let unique: HashSet<&String> = labels.iter().collect();
        assert_eq!(unique.len(), 27);
        assert_eq!(labels.first().unwrap(), "a_1__b_1__c_1");
        assert_eq!(labels[1], "a_1__b_1__c_2");
        assert_eq!(labels[3], "a_1__b_2__c_1");
        assert_eq!(labels.last().unwrap(), "a_3__b_3__c_3");
    }

    #[test]
    fn test_enumeration_order_is_lexicographic() {
        let combos = enumerate_combos(3, 3);
        let mut sorted = combos.clone();
        sorted.sort();
        assert_eq!(combos, sorted);
    }

    #[test]
    fn test_uneven_shapes() {
        assert_eq!(enumerate_combos(2, 4).len(), 16);
        assert_eq!(enumerate_combos(4, 2).len(), 16);
        assert_eq!(
            enumerate_combos(1, 3),
            vec![Combo::new(vec![1]), Combo::new(vec![2]), Combo::new(vec![3])]
        );
        assert!(enumerate_combos(3, 0).is_empty());
    }

    #[test]
    fn test_labels_distinct_with_multi_digit_variants() {
        let reviewers = vec![Reviewer::new("x", "x"), Reviewer::new("y", "y")];
        let labels: HashSet<String> = enumerate_combos(2, 12)
            .iter()
            .map(|c| c.label(&reviewers))
            .collect();
        assert_eq!(labels.len(), 144);
        assert!(labels.contains("x_11__y_2"));
        assert!(labels.contains("x_1__y_12"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            Reviewer::new("prof_amara_kito", "amara").display_name(),
            "PROF AMARA KITO"
        );
    }
}
