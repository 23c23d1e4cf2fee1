//! # Content Registry
//!
//! Data-driven item, NPC, and enemy definitions with spawn rules keyed by
//! dimension and zone level. The registry is read-only at generation
//! time; handlers and the board loader query it for weighted pools.
//!
//! Definitions load from a JSON asset when one is present and fall back
//! to the built-in set when it is missing or malformed. A bad asset is
//! never fatal.

use crate::{Dimension, WarrenResult};
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chess movement template bound to an enemy archetype name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChessArchetype {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl ChessArchetype {
    /// Resolves an enemy type name (with or without the `black_` team
    /// prefix) to its movement template.
    pub fn from_enemy_type(enemy_type: &str) -> Option<ChessArchetype> {
        let name = enemy_type.strip_prefix("black_").unwrap_or(enemy_type);
        match name {
            "chess_pawn" => Some(ChessArchetype::Pawn),
            "chess_knight" => Some(ChessArchetype::Knight),
            "chess_bishop" => Some(ChessArchetype::Bishop),
            "chess_rook" => Some(ChessArchetype::Rook),
            "chess_queen" => Some(ChessArchetype::Queen),
            "chess_king" => Some(ChessArchetype::King),
            _ => None,
        }
    }

    /// Material value used by the search evaluation.
    pub fn material_value(self) -> i32 {
        match self {
            ChessArchetype::Pawn => 1,
            ChessArchetype::Knight => 3,
            ChessArchetype::Bishop => 3,
            ChessArchetype::Rook => 5,
            ChessArchetype::Queen => 9,
            ChessArchetype::King => 100,
        }
    }
}

/// Broad item categories driving the spawn-token pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Food,
    Water,
    Gear,
    Radial,
}

/// One placeable item definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub token: String,
    pub uses: u32,
    pub weight: u32,
    pub category: ItemCategory,
}

/// NPC roles recognized by generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcRole {
    Gossip,
    Merchant,
    Keeper,
}

/// One NPC definition with its spawn rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcDef {
    pub id: String,
    pub role: NpcRole,
    /// Independent per-zone spawn roll probability
    pub spawn_weight: f64,
    pub dimensions: Vec<Dimension>,
    pub min_level: u32,
    pub max_level: u32,
}

impl NpcDef {
    pub fn eligible(&self, dimension: Dimension, level: u32) -> bool {
        self.dimensions.contains(&dimension) && level >= self.min_level && level <= self.max_level
    }
}

/// One enemy definition with its spawn rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyDef {
    pub enemy_type: String,
    pub base_health: i32,
    pub dimensions: Vec<Dimension>,
    pub min_level: u32,
}

impl EnemyDef {
    pub fn eligible(&self, dimension: Dimension, level: u32) -> bool {
        self.dimensions.contains(&dimension) && level >= self.min_level
    }

    /// Chess movement template, when this enemy participates in chess
    /// zones.
    pub fn chess_archetype(&self) -> Option<ChessArchetype> {
        ChessArchetype::from_enemy_type(&self.enemy_type)
    }
}

/// Serialized registry asset shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    items: Vec<ItemDef>,
    npcs: Vec<NpcDef>,
    enemies: Vec<EnemyDef>,
}

/// Read-only content definitions consulted at generation time.
#[derive(Debug, Clone)]
pub struct ContentRegistry {
    items: Vec<ItemDef>,
    npcs: Vec<NpcDef>,
    enemies: Vec<EnemyDef>,
    assets_dir: Option<PathBuf>,
}

impl ContentRegistry {
    /// The built-in content set.
    pub fn builtin() -> Self {
        let items = vec![
            item("items/flask", 3, 3, ItemCategory::Gear),
            item("items/rope", 1, 1, ItemCategory::Gear),
            item("items/lantern", 4, 2, ItemCategory::Gear),
            item("items/pickaxe", 2, 1, ItemCategory::Gear),
            item("items/bomb", 1, 1, ItemCategory::Radial),
            item("items/torch", 2, 2, ItemCategory::Radial),
            item("food/bread", 1, 3, ItemCategory::Food),
            item("food/apple", 1, 2, ItemCategory::Food),
            item("food/jerky", 2, 1, ItemCategory::Food),
            item("water/canteen", 3, 2, ItemCategory::Water),
        ];

        let npcs = vec![
            NpcDef {
                id: "old_hermit".to_string(),
                role: NpcRole::Gossip,
                spawn_weight: 0.20,
                dimensions: vec![Dimension::Surface],
                min_level: 0,
                max_level: 3,
            },
            NpcDef {
                id: "wandering_bard".to_string(),
                role: NpcRole::Gossip,
                spawn_weight: 0.15,
                dimensions: vec![Dimension::Surface, Dimension::Underground],
                min_level: 1,
                max_level: 6,
            },
            NpcDef {
                id: "mushroom_sage".to_string(),
                role: NpcRole::Gossip,
                spawn_weight: 0.10,
                dimensions: vec![Dimension::Underground],
                min_level: 2,
                max_level: 9,
            },
            NpcDef {
                id: "traveling_merchant".to_string(),
                role: NpcRole::Merchant,
                spawn_weight: 0.10,
                dimensions: vec![Dimension::Surface, Dimension::Interior],
                min_level: 0,
                max_level: 12,
            },
        ];

        let enemies = vec![
            enemy("stalker", 2, vec![Dimension::Surface], 1),
            enemy("lurker", 3, vec![Dimension::Surface], 2),
            enemy("burrower", 2, vec![Dimension::Underground], 0),
            enemy("dweller", 4, vec![Dimension::Underground], 3),
            enemy("chess_pawn", 1, vec![Dimension::Chess], 0),
            enemy("chess_knight", 3, vec![Dimension::Chess], 0),
            enemy("chess_bishop", 3, vec![Dimension::Chess], 0),
            enemy("chess_rook", 4, vec![Dimension::Chess], 0),
            enemy("chess_queen", 5, vec![Dimension::Chess], 0),
            enemy("chess_king", 6, vec![Dimension::Chess], 0),
        ];

        Self {
            items,
            npcs,
            enemies,
            assets_dir: None,
        }
    }

    /// Loads the registry asset from `<dir>/content/registry.json`,
    /// falling back to the built-in set on any failure.
    pub fn load_or_builtin(assets_dir: &Path) -> Self {
        let path = assets_dir.join("content").join("registry.json");
        let mut registry = match Self::try_load(&path) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(
                    "content registry {} unavailable ({}), using built-in definitions",
                    path.display(),
                    e
                );
                Self::builtin()
            }
        };
        registry.assets_dir = Some(assets_dir.to_path_buf());
        registry
    }

    fn try_load(path: &Path) -> WarrenResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: RegistryFile = serde_json::from_str(&raw)?;
        Ok(Self {
            items: file.items,
            npcs: file.npcs,
            enemies: file.enemies,
            assets_dir: None,
        })
    }

    /// Directory board/character assets are fetched from, when configured.
    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    pub fn items(&self) -> &[ItemDef] {
        &self.items
    }

    /// Weighted draw from one category pool.
    pub fn weighted_item(&self, category: ItemCategory, rng: &mut StdRng) -> Option<&ItemDef> {
        weighted_pick(
            self.items.iter().filter(|i| i.category == category),
            rng,
        )
    }

    /// Weighted draw across the gear pool (the `random_item` token).
    pub fn random_item(&self, rng: &mut StdRng) -> Option<&ItemDef> {
        self.weighted_item(ItemCategory::Gear, rng)
    }

    /// Weighted draw across the radial pool (the `random_radial_item`
    /// token).
    pub fn random_radial_item(&self, rng: &mut StdRng) -> Option<&ItemDef> {
        self.weighted_item(ItemCategory::Radial, rng)
    }

    /// Draws food or water. Whenever the food pool is empty the draw
    /// substitutes water.
    pub fn food_or_water(&self, rng: &mut StdRng) -> ItemDef {
        let has_food = self.items.iter().any(|i| i.category == ItemCategory::Food);
        if !has_food {
            return self
                .weighted_item(ItemCategory::Water, rng)
                .cloned()
                .unwrap_or_else(|| item("water/canteen", 3, 1, ItemCategory::Water));
        }
        weighted_pick(
            self.items
                .iter()
                .filter(|i| matches!(i.category, ItemCategory::Food | ItemCategory::Water)),
            rng,
        )
        .cloned()
        .unwrap_or_else(|| item("water/canteen", 3, 1, ItemCategory::Water))
    }

    /// Gossip NPCs eligible for a zone.
    pub fn gossip_npcs(&self, dimension: Dimension, level: u32) -> Vec<&NpcDef> {
        self.npcs
            .iter()
            .filter(|n| n.role == NpcRole::Gossip && n.eligible(dimension, level))
            .collect()
    }

    /// Merchant NPCs eligible for a zone (the `random_merchant` token).
    pub fn merchants(&self, dimension: Dimension, level: u32) -> Vec<&NpcDef> {
        self.npcs
            .iter()
            .filter(|n| n.role == NpcRole::Merchant && n.eligible(dimension, level))
            .collect()
    }

    /// Enemy definitions eligible for a zone.
    pub fn eligible_enemies(&self, dimension: Dimension, level: u32) -> Vec<&EnemyDef> {
        self.enemies
            .iter()
            .filter(|e| e.eligible(dimension, level))
            .collect()
    }

    /// Looks up an enemy definition by type name, ignoring a `black_`
    /// team prefix.
    pub fn enemy_def(&self, enemy_type: &str) -> Option<&EnemyDef> {
        let name = enemy_type.strip_prefix("black_").unwrap_or(enemy_type);
        self.enemies.iter().find(|e| e.enemy_type == name)
    }

    /// Whether a feature token names an enemy type.
    pub fn is_enemy_token(&self, token: &str) -> bool {
        self.enemy_def(token).is_some()
    }
}

impl Default for ContentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn item(token: &str, uses: u32, weight: u32, category: ItemCategory) -> ItemDef {
    ItemDef {
        token: token.to_string(),
        uses,
        weight,
        category,
    }
}

fn enemy(enemy_type: &str, base_health: i32, dimensions: Vec<Dimension>, min_level: u32) -> EnemyDef {
    EnemyDef {
        enemy_type: enemy_type.to_string(),
        base_health,
        dimensions,
        min_level,
    }
}

fn weighted_pick<'a, I>(pool: I, rng: &mut StdRng) -> Option<&'a ItemDef>
where
    I: Iterator<Item = &'a ItemDef>,
{
    let candidates: Vec<&ItemDef> = pool.collect();
    let total: u32 = candidates.iter().map(|i| i.weight).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for candidate in &candidates {
        if roll < candidate.weight {
            return Some(candidate);
        }
        roll -= candidate.weight;
    }
    candidates.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_chess_archetype_resolution() {
        assert_eq!(
            ChessArchetype::from_enemy_type("chess_knight"),
            Some(ChessArchetype::Knight)
        );
        assert_eq!(
            ChessArchetype::from_enemy_type("black_chess_queen"),
            Some(ChessArchetype::Queen)
        );
        assert_eq!(ChessArchetype::from_enemy_type("stalker"), None);
    }

    #[test]
    fn test_random_item_stays_in_gear_pool() {
        let registry = ContentRegistry::builtin();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let picked = registry.random_item(&mut rng).unwrap();
            assert_eq!(picked.category, ItemCategory::Gear);
        }
    }

    #[test]
    fn test_radial_item_stays_in_radial_pool() {
        let registry = ContentRegistry::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = registry.random_radial_item(&mut rng).unwrap();
            assert_eq!(picked.category, ItemCategory::Radial);
        }
    }

    #[test]
    fn test_food_or_water_draws_from_documented_pool() {
        let registry = ContentRegistry::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let picked = registry.food_or_water(&mut rng);
            assert!(matches!(
                picked.category,
                ItemCategory::Food | ItemCategory::Water
            ));
        }
    }

    #[test]
    fn test_food_falls_back_to_water_when_food_pool_empty() {
        let mut registry = ContentRegistry::builtin();
        registry.items.retain(|i| i.category != ItemCategory::Food);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let picked = registry.food_or_water(&mut rng);
            assert_eq!(picked.category, ItemCategory::Water);
        }
    }

    #[test]
    fn test_gossip_eligibility_by_dimension_and_level() {
        let registry = ContentRegistry::builtin();

        let surface = registry.gossip_npcs(Dimension::Surface, 2);
        assert!(surface.iter().any(|n| n.id == "old_hermit"));
        assert!(!surface.iter().any(|n| n.id == "mushroom_sage"));

        let deep = registry.gossip_npcs(Dimension::Underground, 5);
        assert!(deep.iter().any(|n| n.id == "mushroom_sage"));
        assert!(!deep.iter().any(|n| n.id == "old_hermit"));

        // Level above every max_level
        assert!(registry.gossip_npcs(Dimension::Surface, 40).is_empty());
    }

    #[test]
    fn test_enemy_eligibility_scales_with_level() {
        let registry = ContentRegistry::builtin();

        let easy = registry.eligible_enemies(Dimension::Surface, 1);
        assert!(easy.iter().any(|e| e.enemy_type == "stalker"));
        assert!(!easy.iter().any(|e| e.enemy_type == "lurker"));

        let harder = registry.eligible_enemies(Dimension::Surface, 3);
        assert!(harder.iter().any(|e| e.enemy_type == "lurker"));
    }

    #[test]
    fn test_enemy_token_recognizes_team_prefix() {
        let registry = ContentRegistry::builtin();
        assert!(registry.is_enemy_token("chess_rook"));
        assert!(registry.is_enemy_token("black_chess_rook"));
        assert!(!registry.is_enemy_token("random_item"));
    }

    #[test]
    fn test_missing_registry_asset_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ContentRegistry::load_or_builtin(dir.path());
        assert!(!registry.items().is_empty());
        assert_eq!(registry.assets_dir(), Some(dir.path()));
    }
}
