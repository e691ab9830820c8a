//! Game-data loader. Each of the four catalogs is fetched independently and
//! falls back to the embedded data set on any network or parse failure.

use anyhow::Context;
use hexcomp_engine::{audit_trait_links, strip_set_prefix, Catalog};
use hexcomp_protocol::{
    Ability, Augment, Breakpoint, Champion, ChampionStats, Item, StyleTier, Trait,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_DATA_BASE: &str = "https://ddragon.leagueoflegends.com/cdn";
pub const DEFAULT_VERSION_URL: &str = "https://ddragon.leagueoflegends.com/api/versions.json";
pub const FALLBACK_VERSION: &str = "15.18.1";
pub const DEFAULT_SET: u32 = 15;

const FALLBACK_CATALOG_JSON: &str = include_str!("../data/fallback_catalog.json");

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub data_base: String,
    pub version_url: String,
    pub set_number: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_base: DEFAULT_DATA_BASE.to_string(),
            version_url: DEFAULT_VERSION_URL.to_string(),
            set_number: DEFAULT_SET,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FallbackData {
    version: String,
    champions: Vec<Champion>,
    traits: Vec<Trait>,
    items: Vec<Item>,
    augments: Vec<Augment>,
}

fn fallback_data() -> FallbackData {
    serde_json::from_str(FALLBACK_CATALOG_JSON).unwrap_or_else(|e| {
        tracing::error!(error = %e, "embedded fallback catalog is malformed");
        FallbackData::default()
    })
}

/// The embedded catalog, used offline and as the per-catalog fallback.
pub fn fallback_catalog() -> Catalog {
    let data = fallback_data();
    Catalog::new(data.version, data.champions, data.traits, data.items, data.augments)
}

/// Per-request mapping context: which set to keep and where images live.
#[derive(Debug, Clone)]
pub struct MapContext {
    pub set_number: u32,
    pub image_root: String,
}

impl MapContext {
    pub fn new(data_base: &str, version: &str, set_number: u32) -> Self {
        Self {
            set_number,
            image_root: format!("{}/{version}/img", data_base.trim_end_matches('/')),
        }
    }

    fn image(&self, kind: &str, entry: &Value, default_file: &str) -> String {
        let file = entry
            .get("image")
            .and_then(|i| i.get("full"))
            .and_then(Value::as_str)
            .unwrap_or(default_file);
        format!("{}/tft-{kind}/{file}", self.image_root)
    }
}

/// First present, non-empty string among `keys`.
fn str_field<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// First present, non-zero number among `keys`; zero reads as absent.
fn num_field(v: Option<&Value>, keys: &[&str]) -> Option<f64> {
    let v = v?;
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_f64))
        .find(|n| *n != 0.0)
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Champion trait entries come as plain names, `{name}` or `{id}` objects.
fn trait_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => str_field(entry, &["name"])
            .map(str::to_string)
            .or_else(|| str_field(entry, &["id"]).map(|id| strip_set_prefix(id).to_string())),
        _ => None,
    }
}

pub fn map_champion(v: &Value, ctx: &MapContext) -> Option<Champion> {
    let raw_id = v.get("id").and_then(Value::as_str)?;
    if !raw_id.starts_with(&format!("TFT{}_", ctx.set_number)) {
        return None;
    }
    let name = str_field(v, &["name"]).unwrap_or(raw_id).to_string();
    let id = str_field(v, &["apiName"]).unwrap_or(raw_id).to_string();

    let defaults = ChampionStats::default();
    let stats = v.get("stats");
    let ability = v.get("ability");
    let damage = ability
        .and_then(|a| a.get("variables"))
        .and_then(Value::as_array)
        .and_then(|vars| {
            vars.iter()
                .find(|var| var.get("name").and_then(Value::as_str) == Some("Damage"))
        })
        .and_then(|var| var.get("value"))
        .and_then(Value::as_array)
        .map(|vals| vals.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_else(|| vec![100.0, 150.0, 200.0]);
    let ability_defaults = Ability::default();

    Some(Champion {
        cost: num_field(Some(v), &["tier", "cost"]).map_or(1, |c| c.clamp(1.0, 5.0) as u8),
        traits: v
            .get("traits")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(trait_name).collect())
            .unwrap_or_default(),
        stats: ChampionStats {
            damage: num_field(stats, &["damage"]).unwrap_or(defaults.damage),
            health: num_field(stats, &["hp"]).unwrap_or(defaults.health),
            armor: num_field(stats, &["armor"]).unwrap_or(defaults.armor),
            magic_resist: num_field(stats, &["magicResist"]).unwrap_or(defaults.magic_resist),
            attack_speed: num_field(stats, &["attackSpeed"]).unwrap_or(defaults.attack_speed),
            range: num_field(stats, &["range"]).unwrap_or(defaults.range),
        },
        ability: Ability {
            name: ability
                .and_then(|a| str_field(a, &["name"]))
                .map_or(ability_defaults.name, str::to_string),
            description: ability
                .and_then(|a| str_field(a, &["desc"]))
                .map_or(ability_defaults.description, str::to_string),
            mana_cost: num_field(ability, &["startingMana"])
                .map_or(ability_defaults.mana_cost, |m| m.max(0.0) as u32),
            damage,
        },
        image: ctx.image("champion", v, "TFT_Champion_Default.png"),
        id,
        name,
    })
}

fn map_breakpoint(v: &Value) -> Option<Breakpoint> {
    let min_units = v.get("minUnits").and_then(Value::as_u64)?;
    let style = v.get("style").and_then(Value::as_i64).and_then(StyleTier::from_raw);
    let Some(style) = style else {
        tracing::debug!(effect = %v, "dropping breakpoint with unknown style");
        return None;
    };
    Some(Breakpoint {
        min_units: u32::try_from(min_units).ok()?,
        max_units: v
            .get("maxUnits")
            .and_then(Value::as_u64)
            .and_then(|m| u32::try_from(m).ok()),
        style,
    })
}

pub fn map_trait(v: &Value, ctx: &MapContext) -> Option<Trait> {
    let id = v.get("id").and_then(Value::as_str)?;
    let prefixes = [
        format!("TFT{}_", ctx.set_number),
        format!("Set{}_", ctx.set_number),
    ];
    if !prefixes.iter().any(|p| id.starts_with(p.as_str())) {
        return None;
    }
    let name = str_field(v, &["name"]).unwrap_or(id).to_string();
    let breakpoints = match v.get("effects").and_then(Value::as_array) {
        Some(effects) => effects.iter().filter_map(map_breakpoint).collect(),
        None => Trait::default_breakpoints(),
    };
    Some(Trait {
        id: id.to_string(),
        description: str_field(v, &["description"])
            .map_or_else(|| format!("{name} trait description"), str::to_string),
        breakpoints,
        image: ctx.image("trait", v, "TFT_Trait_Default.png"),
        name,
    })
}

pub fn map_item(v: &Value, ctx: &MapContext) -> Option<Item> {
    let id = v.get("id").and_then(Value::as_str)?;
    let name = v.get("name").and_then(Value::as_str).map(str::trim)?;
    if name.is_empty() || id.contains("Tutorial") {
        return None;
    }
    let stats: BTreeMap<String, f64> = v
        .get("effects")
        .and_then(Value::as_object)
        .map(|effects| {
            effects
                .iter()
                .filter_map(|(k, n)| n.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default();
    let mut recipe = string_list(v.get("composition"));
    if recipe.is_empty() {
        recipe = string_list(v.get("from"));
    }
    Some(Item {
        id: id.to_string(),
        name: name.to_string(),
        description: str_field(v, &["desc", "description"])
            .unwrap_or("No description available")
            .to_string(),
        stats,
        image: ctx.image("item", v, "TFT_Item_Default.png"),
        recipe,
    })
}

pub fn map_augment(v: &Value, ctx: &MapContext) -> Option<Augment> {
    let id = v.get("id").and_then(Value::as_str)?;
    let set = ctx.set_number;
    if !(id.contains(&format!("Set{set}")) || id.contains(&format!("TFT{set}"))) {
        return None;
    }
    Some(Augment {
        id: id.to_string(),
        name: str_field(v, &["name"]).unwrap_or("Unknown Augment").to_string(),
        description: str_field(v, &["desc", "description"])
            .unwrap_or("No description available")
            .to_string(),
        tier: num_field(Some(v), &["tier"]).map_or(1, |t| t.clamp(1.0, 255.0) as u8),
        associated_traits: string_list(v.get("associatedTraits")),
        image: ctx.image("augment", v, "TFT_Augment_Default.png"),
    })
}

/// Maps the `data` object of a catalog file, dropping entries that don't map.
pub fn map_entries<T>(
    file: &Value,
    ctx: &MapContext,
    map: fn(&Value, &MapContext) -> Option<T>,
) -> anyhow::Result<Vec<T>> {
    let entries: &Map<String, Value> = file
        .get("data")
        .and_then(Value::as_object)
        .context("catalog file has no `data` object")?;
    Ok(entries.values().filter_map(|v| map(v, ctx)).collect())
}

#[derive(Debug, Clone)]
pub struct CatalogLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl CatalogLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_json(&self, url: &str) -> anyhow::Result<Value> {
        let value: Value = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .with_context(|| format!("decode {url}"))?;
        Ok(value)
    }

    /// Latest content version, or [`FALLBACK_VERSION`] when the lookup fails.
    pub async fn resolve_version(&self) -> String {
        let latest = self.fetch_json(&self.config.version_url).await.and_then(|v| {
            v.get(0)
                .and_then(Value::as_str)
                .map(str::to_string)
                .context("versions list is empty")
        });
        match latest {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!(error = %e, fallback = FALLBACK_VERSION, "version lookup failed");
                FALLBACK_VERSION.to_string()
            }
        }
    }

    async fn fetch_catalog<T>(
        &self,
        version: &str,
        file: &str,
        map: fn(&Value, &MapContext) -> Option<T>,
    ) -> anyhow::Result<Vec<T>> {
        let base = self.config.data_base.trim_end_matches('/');
        let url = format!("{base}/{version}/data/en_US/{file}.json");
        let data = self.fetch_json(&url).await?;
        let ctx = MapContext::new(base, version, self.config.set_number);
        map_entries(&data, &ctx, map)
    }

    /// Fetches all four catalogs concurrently. Never fails: each catalog that
    /// can't be fetched or parsed is replaced by its embedded fallback.
    pub async fn load(&self) -> Catalog {
        let version = self.resolve_version().await;
        let (champions, traits, items, augments) = tokio::join!(
            self.fetch_catalog(&version, "tft-champion", map_champion),
            self.fetch_catalog(&version, "tft-trait", map_trait),
            self.fetch_catalog(&version, "tft-item", map_item),
            self.fetch_catalog(&version, "tft-augments", map_augment),
        );

        let fallback = fallback_data();
        let catalog = Catalog::new(
            version,
            or_fallback("champions", champions, fallback.champions),
            or_fallback("traits", traits, fallback.traits),
            or_fallback("items", items, fallback.items),
            or_fallback("augments", augments, fallback.augments),
        );
        report_loaded(&catalog);
        catalog
    }
}

fn or_fallback<T>(kind: &str, fetched: anyhow::Result<Vec<T>>, fallback: Vec<T>) -> Vec<T> {
    match fetched {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(catalog = kind, error = %format!("{e:#}"), "using embedded fallback");
            fallback
        }
    }
}

/// Logs counts and any champion trait that links to no catalog trait.
pub fn report_loaded(catalog: &Catalog) {
    tracing::info!(
        version = %catalog.version,
        champions = catalog.champions.len(),
        traits = catalog.traits.len(),
        items = catalog.items.len(),
        augments = catalog.augments.len(),
        "catalogs loaded"
    );
    for unlinked in audit_trait_links(&catalog.traits, &catalog.champions) {
        tracing::warn!(
            champion = %unlinked.champion_id,
            trait_name = %unlinked.trait_name,
            "champion trait has no catalog entry"
        );
    }
}
