use hexcomp_protocol::{Augment, CatalogInfo, Champion, Item, ItemGroups, Trait};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::synergy::trait_key;

/// Standard component items; everything else counts as combined.
pub const BASIC_ITEM_IDS: [&str; 9] = [
    "TFT_Item_BFSword",
    "TFT_Item_RecurveBow",
    "TFT_Item_NeedlesslyLargeRod",
    "TFT_Item_ChainVest",
    "TFT_Item_NegatronCloak",
    "TFT_Item_GiantsBelt",
    "TFT_Item_TearOfTheGoddess",
    "TFT_Item_SparringGloves",
    "TFT_Item_Spatula",
];

pub fn is_basic_item(item: &Item) -> bool {
    BASIC_ITEM_IDS.contains(&item.id.as_str())
}

/// Immutable game data shared by the board (champions and items are handed
/// out as `Arc`s so placed entries reference, not copy, catalog rows).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub version: String,
    pub champions: Vec<Arc<Champion>>,
    pub traits: Vec<Trait>,
    pub items: Vec<Arc<Item>>,
    pub augments: Vec<Augment>,
}

#[derive(Debug, Clone, Default)]
pub struct ChampionQuery {
    pub search: Option<String>,
    pub cost: Option<u8>,
    pub trait_name: Option<String>,
}

impl Catalog {
    pub fn new(
        version: impl Into<String>,
        champions: Vec<Champion>,
        traits: Vec<Trait>,
        items: Vec<Item>,
        augments: Vec<Augment>,
    ) -> Self {
        Self {
            version: version.into(),
            champions: champions.into_iter().map(Arc::new).collect(),
            traits,
            items: items.into_iter().map(Arc::new).collect(),
            augments,
        }
    }

    pub fn champion(&self, id: &str) -> Option<Arc<Champion>> {
        self.champions.iter().find(|c| c.id == id).cloned()
    }

    pub fn item(&self, id: &str) -> Option<Arc<Item>> {
        self.items.iter().find(|i| i.id == id).cloned()
    }

    /// Sorted unique trait strings carried by champions.
    pub fn trait_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .champions
            .iter()
            .flat_map(|c| c.traits.iter().map(String::as_str))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    pub fn search_champions(&self, query: &ChampionQuery) -> Vec<Arc<Champion>> {
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let wanted_trait = query.trait_name.as_deref().map(trait_key);

        self.champions
            .iter()
            .filter(|c| match &needle {
                Some(n) => {
                    c.name.to_lowercase().contains(n.as_str())
                        || c.traits.iter().any(|t| t.to_lowercase().contains(n.as_str()))
                }
                None => true,
            })
            .filter(|c| query.cost.map_or(true, |cost| c.cost == cost))
            .filter(|c| match &wanted_trait {
                Some(key) => c.traits.iter().any(|t| &trait_key(t) == key),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Name search over real items; tutorial and empty placeholders are hidden.
    pub fn search_items(&self, search: Option<&str>) -> Vec<Arc<Item>> {
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        self.items
            .iter()
            .filter(|i| !i.name.is_empty() && !i.id.contains("Tutorial") && !i.id.contains("Empty"))
            .filter(|i| needle.is_empty() || i.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// [`Catalog::search_items`] split into components and combined items.
    pub fn group_items(&self, search: Option<&str>) -> ItemGroups {
        let (basic, combined) = self
            .search_items(search)
            .into_iter()
            .partition(|i| is_basic_item(i));
        ItemGroups { basic, combined }
    }

    pub fn info(&self) -> CatalogInfo {
        CatalogInfo {
            version: self.version.clone(),
            champions: self.champions.len(),
            traits: self.traits.len(),
            items: self.items.len(),
            augments: self.augments.len(),
            trait_names: self.trait_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexcomp_protocol::{Ability, ChampionStats};
    use std::collections::BTreeMap;

    fn champ(id: &str, name: &str, cost: u8, traits: &[&str]) -> Champion {
        Champion {
            id: id.into(),
            name: name.into(),
            cost,
            traits: traits.iter().map(|t| t.to_string()).collect(),
            stats: ChampionStats::default(),
            ability: Ability::default(),
            image: String::new(),
        }
    }

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            stats: BTreeMap::new(),
            image: String::new(),
            recipe: Vec::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            "15.18.1",
            vec![
                champ("annie", "Annie", 1, &["Invoker", "Sugarcraft"]),
                champ("blitzcrank", "Blitzcrank", 2, &["Honeymancy", "Vanguard"]),
                champ("jinx", "Jinx", 3, &["Sugarcraft", "Hunter"]),
            ],
            Vec::new(),
            vec![
                item("TFT_Item_BFSword", "B.F. Sword"),
                item("TFT_Tutorial_Sword", "Practice Sword"),
                item("TFT_Item_EmptyBag", "Empty"),
                item("TFT_Item_InfinityEdge", "Infinity Edge"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn lookups_share_the_catalog_row() {
        let cat = catalog();
        let a = cat.champion("annie").unwrap();
        let b = cat.champion("annie").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cat.champion("zed").is_none());
        assert!(cat.item("TFT_Item_BFSword").is_some());
    }

    #[test]
    fn search_matches_name_or_trait_substring() {
        let cat = catalog();
        let q = ChampionQuery {
            search: Some("sugar".into()),
            ..Default::default()
        };
        let ids: Vec<_> = cat.search_champions(&q).iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, ["annie", "jinx"]);

        let q = ChampionQuery {
            search: Some("BLITZ".into()),
            ..Default::default()
        };
        assert_eq!(cat.search_champions(&q).len(), 1);
    }

    #[test]
    fn cost_and_trait_filters_combine() {
        let cat = catalog();
        let q = ChampionQuery {
            cost: Some(3),
            trait_name: Some("sugarcraft".into()),
            ..Default::default()
        };
        let hits = cat.search_champions(&q);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "jinx");
    }

    #[test]
    fn item_search_hides_placeholders() {
        let cat = catalog();
        let names: Vec<_> = cat.search_items(None).iter().map(|i| i.name.clone()).collect();
        assert_eq!(names, ["B.F. Sword", "Infinity Edge"]);
        assert_eq!(cat.search_items(Some("edge")).len(), 1);
        assert!(is_basic_item(&cat.items[0]));
        assert!(!is_basic_item(&cat.items[3]));
    }

    #[test]
    fn items_group_into_components_and_combined() {
        let groups = catalog().group_items(None);
        let basic: Vec<_> = groups.basic.iter().map(|i| i.id.as_str()).collect();
        let combined: Vec<_> = groups.combined.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(basic, ["TFT_Item_BFSword"]);
        assert_eq!(combined, ["TFT_Item_InfinityEdge"]);
        assert!(catalog().group_items(Some("sword")).combined.is_empty());
    }

    #[test]
    fn info_lists_sorted_trait_names() {
        let info = catalog().info();
        assert_eq!(info.champions, 3);
        assert_eq!(
            info.trait_names,
            ["Honeymancy", "Hunter", "Invoker", "Sugarcraft", "Vanguard"]
        );
    }
}
