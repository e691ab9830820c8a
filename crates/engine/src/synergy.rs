//! Trait activation.
//!
//! Champion trait strings and catalog traits are linked through one
//! canonical key ([`trait_key`]): set-version prefix stripped, lowercased,
//! non-alphanumerics dropped. A champion trait string counts toward a
//! catalog trait only when its key equals the key of the trait's display
//! name or of its raw id. No substring matching.
//!
//! Everything here is recomputed from scratch on every call. The board is
//! bounded at 28 entries, so there is nothing to cache.

use hexcomp_protocol::{
    Augment, Breakpoint, Champion, PlacedChampion, StyleTier, SynergyView, TeamSummary, Trait,
};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

static SET_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(tft|set)\d+_").expect("valid regex"));

/// `TFT15_StarGuardian` -> `StarGuardian`. Strings without a prefix pass through.
pub fn strip_set_prefix(raw: &str) -> &str {
    match SET_PREFIX_RE.find(raw) {
        Some(m) => &raw[m.end()..],
        None => raw,
    }
}

pub fn trait_key(raw: &str) -> String {
    strip_set_prefix(raw.trim())
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitActivation<'a> {
    pub trait_def: &'a Trait,
    pub count: usize,
    /// 1-based index of the highest satisfied breakpoint; 0 when inactive.
    pub active_level: usize,
    pub style: Option<StyleTier>,
}

impl TraitActivation<'_> {
    pub fn is_active(&self) -> bool {
        self.active_level > 0
    }

    /// Unit count of the first breakpoint not yet reached.
    pub fn next_breakpoint(&self) -> Option<u32> {
        self.trait_def
            .breakpoints
            .iter()
            .map(|b| b.min_units)
            .find(|&min| min as usize > self.count)
    }

    pub fn style_label(&self) -> &'static str {
        self.style.map_or("Inactive", StyleTier::label)
    }

    pub fn to_view(&self) -> SynergyView {
        SynergyView {
            id: self.trait_def.id.clone(),
            name: self.trait_def.name.clone(),
            description: self.trait_def.description.clone(),
            count: self.count,
            active_level: self.active_level,
            style: self.style,
            style_label: self.style_label().to_string(),
            breakpoints: self.trait_def.breakpoints.clone(),
            next_breakpoint: self.next_breakpoint(),
        }
    }
}

/// Highest breakpoint (scanning from the top) whose threshold the count meets.
fn active_breakpoint(breakpoints: &[Breakpoint], count: usize) -> Option<(usize, StyleTier)> {
    breakpoints
        .iter()
        .enumerate()
        .rev()
        .find(|(_, b)| b.min_units as usize <= count)
        .map(|(i, b)| (i + 1, b.style))
}

fn keys_for(trait_def: &Trait) -> [String; 2] {
    [trait_key(&trait_def.name), trait_key(&trait_def.id)]
}

fn carries(champion: &Champion, keys: &[String; 2]) -> bool {
    champion.traits.iter().any(|t| {
        let k = trait_key(t);
        !k.is_empty() && keys.contains(&k)
    })
}

/// One activation per catalog trait, in catalog order.
pub fn resolve<'a>(traits: &'a [Trait], champions: &[PlacedChampion]) -> Vec<TraitActivation<'a>> {
    traits
        .iter()
        .map(|trait_def| {
            let keys = keys_for(trait_def);
            let count = champions
                .iter()
                .filter(|pc| carries(&pc.champion, &keys))
                .count();
            let (active_level, style) = match active_breakpoint(&trait_def.breakpoints, count) {
                Some((level, style)) => (level, Some(style)),
                None => (0, None),
            };
            TraitActivation {
                trait_def,
                count,
                active_level,
                style,
            }
        })
        .collect()
}

/// Display variant of [`resolve`]: only traits with at least one unit.
pub fn resolve_active<'a>(
    traits: &'a [Trait],
    champions: &[PlacedChampion],
) -> Vec<TraitActivation<'a>> {
    resolve(traits, champions)
        .into_iter()
        .filter(|a| a.count > 0)
        .collect()
}

pub fn summarize(traits: &[Trait], champions: &[PlacedChampion]) -> TeamSummary {
    let gold_or_better = resolve(traits, champions)
        .iter()
        .filter(|a| a.style.is_some_and(|s| s >= StyleTier::Gold))
        .count();
    let trait_names: BTreeSet<&str> = champions
        .iter()
        .flat_map(|pc| pc.champion.traits.iter().map(String::as_str))
        .collect();
    TeamSummary {
        units: champions.len(),
        total_cost: champions.iter().map(|pc| u32::from(pc.champion.cost)).sum(),
        gold_or_better,
        traits: trait_names.into_iter().map(str::to_string).collect(),
    }
}

/// Augments tied to at least one trait carried by a board champion.
pub fn relevant_augments<'a>(
    augments: &'a [Augment],
    champions: &[PlacedChampion],
) -> Vec<&'a Augment> {
    let board_keys: HashSet<String> = champions
        .iter()
        .flat_map(|pc| pc.champion.traits.iter().map(|t| trait_key(t)))
        .filter(|k| !k.is_empty())
        .collect();
    augments
        .iter()
        .filter(|a| a.associated_traits.iter().any(|t| board_keys.contains(&trait_key(t))))
        .collect()
}

/// A champion trait string that links to no catalog trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkedTrait {
    pub champion_id: String,
    pub trait_name: String,
}

/// Data-quality check run after catalogs load.
pub fn audit_trait_links(traits: &[Trait], champions: &[Arc<Champion>]) -> Vec<UnlinkedTrait> {
    let known: HashSet<String> = traits.iter().flat_map(keys_for).collect();
    let known = &known;
    champions
        .iter()
        .flat_map(move |c| {
            c.traits
                .iter()
                .filter(move |t| !known.contains(&trait_key(t)))
                .map(move |t| UnlinkedTrait {
                    champion_id: c.id.clone(),
                    trait_name: t.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::champion;
    use crate::board::Board;
    use hexcomp_protocol::BoardPosition;

    fn trait_def(id: &str, name: &str, ramp: &[(u32, StyleTier)]) -> Trait {
        Trait {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            breakpoints: ramp.iter().map(|&(min, style)| Breakpoint::new(min, style)).collect(),
            image: String::new(),
        }
    }

    fn ramp() -> Vec<(u32, StyleTier)> {
        vec![(2, StyleTier::Bronze), (4, StyleTier::Silver), (6, StyleTier::Gold)]
    }

    fn board_with(traits_per_unit: &[&[&str]]) -> Board {
        let mut board = Board::default();
        for (i, traits) in traits_per_unit.iter().enumerate() {
            board
                .place_first_empty(champion(&format!("c{i}"), 1, traits))
                .unwrap();
        }
        board
    }

    #[test]
    fn trait_key_strips_prefix_case_and_spacing() {
        assert_eq!(trait_key("TFT15_StarGuardian"), "starguardian");
        assert_eq!(trait_key("Set15_Star_Guardian"), "starguardian");
        assert_eq!(trait_key("Star Guardian"), "starguardian");
        assert_eq!(trait_key("sorcerer"), "sorcerer");
        assert_eq!(strip_set_prefix("TFT15_Sorcerer"), "Sorcerer");
        assert_eq!(strip_set_prefix("Sorcerer"), "Sorcerer");
    }

    #[test]
    fn four_units_reach_silver() {
        let traits = vec![trait_def("TFT15_Invoker", "Invoker", &ramp())];
        let board = board_with(&[&["Invoker"], &["Invoker"], &["invoker"], &["INVOKER"]]);

        let acts = resolve(&traits, board.champions());
        assert_eq!(acts[0].count, 4);
        assert_eq!(acts[0].active_level, 2);
        assert_eq!(acts[0].style, Some(StyleTier::Silver));
        assert_eq!(acts[0].next_breakpoint(), Some(6));
    }

    #[test]
    fn single_unit_below_first_breakpoint_is_inactive() {
        let traits = vec![trait_def("TFT15_Invoker", "Invoker", &ramp())];
        let board = board_with(&[&["Invoker"]]);

        let act = resolve(&traits, board.champions())[0];
        assert_eq!(act.count, 1);
        assert_eq!(act.active_level, 0);
        assert_eq!(act.style, None);
        assert!(!act.is_active());
        assert_eq!(act.style_label(), "Inactive");
    }

    #[test]
    fn top_breakpoint_wins_and_has_no_next() {
        let traits = vec![trait_def("x", "Vanguard", &ramp())];
        let units = vec![&["Vanguard"][..]; 7];
        let board = board_with(&units);

        let act = resolve(&traits, board.champions())[0];
        assert_eq!(act.active_level, 3);
        assert_eq!(act.style, Some(StyleTier::Gold));
        assert_eq!(act.next_breakpoint(), None);
    }

    #[test]
    fn matches_on_raw_id_as_well_as_name() {
        let traits = vec![trait_def("TFT15_StarGuardian", "Star Guardian", &ramp())];
        let board = board_with(&[&["StarGuardian"], &["Star Guardian"]]);
        assert_eq!(resolve(&traits, board.champions())[0].count, 2);
    }

    #[test]
    fn substring_names_do_not_cross_count() {
        let traits = vec![
            trait_def("TFT15_Guard", "Guard", &ramp()),
            trait_def("TFT15_Guardian", "Guardian", &ramp()),
        ];
        let board = board_with(&[&["Guardian"], &["Guardian"]]);

        let acts = resolve(&traits, board.champions());
        assert_eq!(acts[0].count, 0);
        assert_eq!(acts[1].count, 2);
    }

    #[test]
    fn champion_counted_once_per_trait() {
        let traits = vec![trait_def("TFT15_Sorcerer", "Sorcerer", &ramp())];
        let board = board_with(&[&["Sorcerer", "TFT15_Sorcerer"]]);
        assert_eq!(resolve(&traits, board.champions())[0].count, 1);
    }

    #[test]
    fn resolve_keeps_catalog_order_and_active_filters_empty() {
        let traits = vec![
            trait_def("a", "Alpha", &ramp()),
            trait_def("b", "Beta", &ramp()),
            trait_def("c", "Gamma", &ramp()),
        ];
        let board = board_with(&[&["Gamma"], &["Alpha"]]);

        let all: Vec<_> = resolve(&traits, board.champions())
            .iter()
            .map(|a| a.trait_def.name.as_str())
            .collect();
        assert_eq!(all, ["Alpha", "Beta", "Gamma"]);

        let shown: Vec<_> = resolve_active(&traits, board.champions())
            .iter()
            .map(|a| a.trait_def.name.as_str())
            .collect();
        assert_eq!(shown, ["Alpha", "Gamma"]);
    }

    #[test]
    fn empty_board_activates_nothing() {
        let traits = vec![trait_def("a", "Alpha", &ramp())];
        assert!(resolve_active(&traits, &[]).is_empty());
        assert_eq!(resolve(&traits, &[])[0].count, 0);
    }

    #[test]
    fn summary_counts_cost_and_gold_traits() {
        let traits = vec![
            trait_def("a", "Alpha", &[(1, StyleTier::Gold)]),
            trait_def("b", "Beta", &[(1, StyleTier::Bronze)]),
        ];
        let mut board = Board::default();
        board.place(champion("x", 3, &["Alpha", "Beta"]), BoardPosition::new(0, 0)).unwrap();
        board.place(champion("y", 5, &["Beta"]), BoardPosition::new(1, 0)).unwrap();

        let summary = summarize(&traits, board.champions());
        assert_eq!(summary.units, 2);
        assert_eq!(summary.total_cost, 8);
        assert_eq!(summary.gold_or_better, 1);
        assert_eq!(summary.traits, ["Alpha", "Beta"]);
    }

    #[test]
    fn augments_filtered_by_board_traits() {
        let augments = vec![
            Augment {
                id: "set15_star_guardian_heart".into(),
                name: "Star Guardian Heart".into(),
                description: String::new(),
                tier: 2,
                associated_traits: vec!["Star Guardian".into()],
                image: String::new(),
            },
            Augment {
                id: "set15_sorcerer_crown".into(),
                name: "Sorcerer Crown".into(),
                description: String::new(),
                tier: 2,
                associated_traits: vec!["Sorcerer".into()],
                image: String::new(),
            },
        ];
        let board = board_with(&[&["StarGuardian"]]);

        let relevant = relevant_augments(&augments, board.champions());
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].id, "set15_star_guardian_heart");
    }

    #[test]
    fn audit_reports_unlinked_champion_traits() {
        let traits = vec![trait_def("Invoker", "Invoker", &ramp())];
        let champions = vec![champion("annie", 1, &["Invoker", "Sugarcraft"])];

        let unlinked = audit_trait_links(&traits, &champions);
        assert_eq!(
            unlinked,
            vec![UnlinkedTrait {
                champion_id: "annie".into(),
                trait_name: "Sugarcraft".into(),
            }]
        );
    }
}
