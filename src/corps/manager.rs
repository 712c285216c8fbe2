//! Corps manager - creation, orders, upkeep and movement
//!
//! State machine: idle and defending accept orders; moving, attacking and
//! retreating are busy until they resolve. Routing is entered whenever morale
//! falls below the rout threshold and is left only by retreating or
//! disbanding. A retreat order is always accepted and replaces whatever the
//! corps was doing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::CorpsConfig;
use crate::core::error::{CommandError, CommandOk};
use crate::core::types::{CorpsId, FrontId, HexCoord, PolityId, Side};
use crate::corps::{ArmyPool, AttackTarget, BattleRecord, Corps, CorpsCommand, CorpsState, General};
use crate::front::terrain::TerrainGrid;
use crate::units::{Army, Losses, UnitCatalog};

/// Speed used when no unit in the corps is known to the catalog
const FALLBACK_SPEED: f64 = 1.0;

/// Result of one day of movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub corps: CorpsId,
    pub from: HexCoord,
    pub to: HexCoord,
    pub arrived: bool,
}

/// What became of a corps after a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpsFate {
    Holding,
    Retreating,
    Destroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpsManager {
    corps: BTreeMap<CorpsId, Corps>,
    next_id: u32,
    config: CorpsConfig,
}

impl CorpsManager {
    pub fn new(config: CorpsConfig) -> Self {
        Self {
            corps: BTreeMap::new(),
            next_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &CorpsConfig {
        &self.config
    }

    pub fn get(&self, id: CorpsId) -> Option<&Corps> {
        self.corps.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Corps> {
        self.corps.values()
    }

    pub fn len(&self) -> usize {
        self.corps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corps.is_empty()
    }

    pub fn owned_by(&self, owner: PolityId) -> impl Iterator<Item = &Corps> {
        self.corps.values().filter(move |c| c.owner == owner)
    }

    pub fn on_front(&self, front: FrontId) -> impl Iterator<Item = &Corps> {
        self.corps.values().filter(move |c| c.front == Some(front))
    }

    /// Units held in corps by `owner`
    pub fn units_held(&self, owner: PolityId) -> u32 {
        self.owned_by(owner).map(Corps::unit_count).sum()
    }

    fn lookup_mut(&mut self, id: CorpsId) -> Result<&mut Corps, CommandError> {
        self.corps.get_mut(&id).ok_or(CommandError::UnknownCorps(id))
    }

    /// Form a corps from units in `owner`'s standing army
    pub fn create(
        &mut self,
        pool: &mut ArmyPool,
        owner: PolityId,
        side: Side,
        name: impl Into<String>,
        units: &Army,
        position: HexCoord,
    ) -> Result<CorpsId, CommandError> {
        let owned = self.owned_by(owner).count();
        if owned >= self.config.max_per_owner {
            return Err(CommandError::CorpsCap(self.config.max_per_owner));
        }
        let units = pool.army_mut(owner).try_withdraw(units)?;

        self.next_id += 1;
        let id = CorpsId(self.next_id);
        let corps = Corps {
            id,
            owner,
            name: name.into(),
            side,
            front: None,
            position,
            target: None,
            units,
            state: CorpsState::Idle,
            morale: self.config.start_morale,
            supplies: self.config.start_supplies,
            pending: None,
            progress: 0.0,
            battle_history: Vec::new(),
            general: None,
        };
        tracing::info!(corps = id.0, owner = owner.0, units = corps.unit_count(), "corps formed");
        self.corps.insert(id, corps);
        Ok(id)
    }

    /// Dissolve a corps, returning its units to the owner's standing army
    ///
    /// The corps is removed before its units are deposited, so they can only
    /// ever be returned once.
    pub fn disband(&mut self, id: CorpsId, pool: &mut ArmyPool) -> Result<u32, CommandError> {
        let mut corps = self.corps.remove(&id).ok_or(CommandError::UnknownCorps(id))?;
        let units = corps.units.drain();
        let returned = units.total();
        pool.deposit(corps.owner, units);
        tracing::info!(corps = id.0, returned, "corps disbanded");
        Ok(returned)
    }

    /// Move units from the standing army into a corps
    pub fn reinforce(
        &mut self,
        id: CorpsId,
        pool: &mut ArmyPool,
        units: &Army,
    ) -> Result<CommandOk, CommandError> {
        let resupply = self.config.reinforce_supplies;
        let corps = self.lookup_mut(id)?;
        if corps.is_routing() {
            return Err(CommandError::Routing);
        }
        let moved = pool.army_mut(corps.owner).try_withdraw(units)?;
        let added = moved.total();
        corps.units.deposit(moved);
        corps.supplies = (corps.supplies + resupply).clamp(0.0, 100.0);
        Ok(CommandOk::new(format!("{} reinforced with {added} units", corps.name)))
    }

    /// Split units off a corps back into the standing army
    ///
    /// The corps must keep at least one unit; use [`Self::disband`] to
    /// release everything.
    pub fn detach(
        &mut self,
        id: CorpsId,
        pool: &mut ArmyPool,
        units: &Army,
    ) -> Result<CommandOk, CommandError> {
        let corps = self.lookup_mut(id)?;
        let mut rest = corps.units.clone();
        let moved = rest.try_withdraw(units)?;
        if rest.is_empty() {
            return Err(CommandError::WouldEmpty);
        }
        corps.units = rest;
        let detached = moved.total();
        pool.deposit(corps.owner, moved);
        tracing::info!(corps = id.0, detached, "units detached");
        Ok(CommandOk::new(format!("{detached} units detached from {}", corps.name)))
    }

    /// Put a general in command, returning the one replaced
    pub fn appoint(&mut self, id: CorpsId, general: Option<General>) -> Result<Option<General>, CommandError> {
        let corps = self.lookup_mut(id)?;
        Ok(std::mem::replace(&mut corps.general, general))
    }

    /// Put a corps under a front's command at `at`
    ///
    /// Orders from any earlier front are dropped and the corps takes the
    /// side its owner holds on the new one. A routing corps stays routed.
    pub fn enlist(&mut self, id: CorpsId, front: FrontId, side: Side, at: HexCoord) -> Result<(), CommandError> {
        let corps = self.lookup_mut(id)?;
        corps.front = Some(front);
        corps.side = side;
        corps.position = at;
        corps.target = None;
        corps.pending = None;
        corps.progress = 0.0;
        if !corps.is_routing() {
            corps.state = CorpsState::Idle;
        }
        Ok(())
    }

    pub fn set_front(&mut self, id: CorpsId, front: Option<FrontId>) -> Result<(), CommandError> {
        self.lookup_mut(id)?.front = front;
        Ok(())
    }

    /// Place a corps directly, e.g. at its side's start cell
    pub fn set_position(&mut self, id: CorpsId, at: HexCoord) -> Result<(), CommandError> {
        self.lookup_mut(id)?.position = at;
        Ok(())
    }

    fn check_orders(corps: &Corps) -> Result<(), CommandError> {
        if corps.is_routing() {
            return Err(CommandError::Routing);
        }
        if corps.state.is_busy() {
            return Err(CommandError::Busy(corps.state.name()));
        }
        Ok(())
    }

    /// Order a corps to march to `target`
    pub fn move_to(
        &mut self,
        id: CorpsId,
        target: HexCoord,
        grid: &TerrainGrid,
        catalog: &UnitCatalog,
    ) -> Result<CommandOk, CommandError> {
        let config = self.config.clone();
        let corps = self.lookup_mut(id)?;
        Self::check_orders(corps)?;
        validate_target(grid, target)?;

        if corps.position == target {
            corps.state = CorpsState::Idle;
            return Ok(CommandOk::new(format!("{} is already at {target}", corps.name)).with_eta(0));
        }
        let eta = estimate_days(corps, target, grid, catalog, &config);
        start_march(corps, target, CorpsCommand::Move { target });
        Ok(CommandOk::new(format!("{} marching to {target}", corps.name)).with_eta(eta))
    }

    /// Order an attack on an enemy corps, building or infrastructure at `at`
    ///
    /// Corps targets are engaged on their own cell. Buildings and
    /// infrastructure are engaged from an adjacent cell.
    pub fn attack(
        &mut self,
        id: CorpsId,
        target: AttackTarget,
        at: HexCoord,
        target_side: Side,
        grid: &TerrainGrid,
        catalog: &UnitCatalog,
    ) -> Result<CommandOk, CommandError> {
        let config = self.config.clone();
        let corps = self.lookup_mut(id)?;
        Self::check_orders(corps)?;
        if target_side == corps.side {
            let what = match target {
                AttackTarget::Corps(_) => "corps",
                AttackTarget::Building(_) => "building",
                AttackTarget::Infrastructure(_) => "infrastructure",
            };
            return Err(CommandError::FriendlyTarget(what));
        }
        if !grid.in_bounds(at) {
            return Err(CommandError::OutOfBounds(at.to_string()));
        }

        let command = CorpsCommand::Attack { target };
        let staging = match target {
            AttackTarget::Corps(_) => at,
            AttackTarget::Building(_) | AttackTarget::Infrastructure(_) => {
                if corps.position.distance(&at) <= 1 {
                    corps.position
                } else {
                    let from = corps.position;
                    at.neighbors()
                        .into_iter()
                        .filter(|c| grid.is_open(*c))
                        .min_by_key(|c| (c.distance(&from), *c))
                        .ok_or_else(|| CommandError::Impassable(at.to_string()))?
                }
            }
        };

        if staging == corps.position {
            corps.state = CorpsState::Attacking;
            corps.pending = Some(command);
            corps.target = None;
            return Ok(CommandOk::new(format!("{} engaging at {at}", corps.name)).with_eta(0));
        }
        let eta = estimate_days(corps, staging, grid, catalog, &config);
        start_march(corps, staging, command);
        Ok(CommandOk::new(format!("{} advancing on {at}", corps.name)).with_eta(eta))
    }

    /// Hold position with a defense bonus
    pub fn defend(&mut self, id: CorpsId) -> Result<CommandOk, CommandError> {
        let corps = self.lookup_mut(id)?;
        Self::check_orders(corps)?;
        corps.state = CorpsState::Defending;
        corps.pending = Some(CorpsCommand::Defend);
        corps.target = None;
        Ok(CommandOk::new(format!("{} digging in", corps.name)))
    }

    /// Fall back toward the owner's map edge; accepted in any state
    pub fn retreat(
        &mut self,
        id: CorpsId,
        grid: &TerrainGrid,
        catalog: &UnitCatalog,
    ) -> Result<CommandOk, CommandError> {
        let config = self.config.clone();
        let corps = self.lookup_mut(id)?;
        let target = retreat_point(corps.side, grid);
        if corps.position == target {
            recover_at_edge(corps, &config);
            return Ok(CommandOk::new(format!("{} regrouped", corps.name)).with_eta(0));
        }
        let eta = estimate_days(corps, target, grid, catalog, &config);
        corps.state = CorpsState::Retreating;
        corps.pending = Some(CorpsCommand::Retreat { target });
        corps.target = Some(target);
        corps.progress = 0.0;
        Ok(CommandOk::new(format!("{} retreating", corps.name)).with_eta(eta))
    }

    /// Point a pursuing corps at its quarry's current cell
    pub fn pursue(&mut self, id: CorpsId, at: HexCoord) {
        let Some(corps) = self.corps.get_mut(&id) else { return };
        if !matches!(corps.state, CorpsState::Moving | CorpsState::Attacking) {
            return;
        }
        if corps.position == at {
            corps.state = CorpsState::Attacking;
            corps.target = None;
        } else {
            corps.state = CorpsState::Moving;
            corps.target = Some(at);
        }
    }

    /// Drop an attack order whose target no longer exists
    pub fn stand_down(&mut self, id: CorpsId) {
        if let Some(corps) = self.corps.get_mut(&id) {
            if corps.attack_target().is_some() {
                corps.pending = None;
                corps.target = None;
                if matches!(corps.state, CorpsState::Moving | CorpsState::Attacking) {
                    corps.state = CorpsState::Idle;
                }
            }
        }
    }

    /// One day of marching. `None` when the corps is not under way.
    pub fn advance(&mut self, id: CorpsId, grid: &TerrainGrid, catalog: &UnitCatalog) -> Option<MoveOutcome> {
        let config = self.config.clone();
        let corps = self.corps.get_mut(&id)?;
        if !matches!(corps.state, CorpsState::Moving | CorpsState::Retreating) {
            return None;
        }
        let target = corps.target?;
        let from = corps.position;

        corps.progress += march_speed(corps, catalog, &config);
        while corps.position != target {
            let next = corps.position.step_toward(&target);
            let cost = grid.movement_cost(next);
            if corps.progress + 1e-9 < cost {
                break;
            }
            corps.progress -= cost;
            corps.position = next;
        }

        let arrived = corps.position == target;
        if arrived {
            arrive(corps, &config);
        }
        Some(MoveOutcome {
            corps: id,
            from,
            to: corps.position,
            arrived,
        })
    }

    /// Daily supply drain and its morale effect
    ///
    /// `supply_bonus` is the fraction of drain offset by friendly
    /// infrastructure. Returns true if the corps broke into a rout.
    pub fn daily_upkeep(&mut self, id: CorpsId, supply_bonus: f64) -> bool {
        let config = self.config.clone();
        let Some(corps) = self.corps.get_mut(&id) else { return false };
        let thrift = 1.0 - corps.general_bonuses().supply;
        let drain = config.supply_drain * (1.0 - supply_bonus).clamp(0.0, 1.0) * thrift.max(0.0);
        corps.supplies = (corps.supplies - drain).clamp(0.0, 100.0);
        if corps.supplies < config.low_supply_threshold {
            corps.morale = (corps.morale - config.low_supply_morale_loss).clamp(0.0, 100.0);
        }
        check_rout(corps, &config)
    }

    /// Fold a battle outcome into a corps
    ///
    /// Losers lose morale and fall back toward their edge. A corps left
    /// without units is dissolved.
    pub fn apply_battle(
        &mut self,
        id: CorpsId,
        losses: &Losses,
        record: BattleRecord,
        grid: &TerrainGrid,
        catalog: &UnitCatalog,
    ) -> Result<CorpsFate, CommandError> {
        let config = self.config.clone();
        let corps = self.lookup_mut(id)?;
        corps.units.apply_losses(losses);
        let won = record.won;
        corps.battle_history.push(record);
        if let Some(general) = corps.general.as_mut() {
            general.award_xp(if won { config.victory_xp } else { config.defeat_xp });
        }

        if corps.units.is_empty() {
            self.corps.remove(&id);
            tracing::info!(corps = id.0, "corps destroyed");
            return Ok(CorpsFate::Destroyed);
        }

        if won {
            if corps.attack_target().is_some_and(|t| matches!(t, AttackTarget::Corps(_))) {
                corps.pending = None;
                corps.state = CorpsState::Idle;
            }
            check_rout(corps, &config);
            return Ok(CorpsFate::Holding);
        }

        let steadiness = (1.0 - corps.general_bonuses().morale).max(0.0);
        corps.morale = (corps.morale - config.defeat_morale_loss * steadiness).clamp(0.0, 100.0);
        self.retreat(id, grid, catalog)?;
        Ok(CorpsFate::Retreating)
    }

    /// Supplies spent fighting an engagement
    pub fn battle_upkeep(&mut self, id: CorpsId) {
        let cost = self.config.battle_supply_cost;
        let Some(corps) = self.corps.get_mut(&id) else { return };
        let thrift = (1.0 - corps.general_bonuses().supply).max(0.0);
        corps.supplies = (corps.supplies - cost * thrift).clamp(0.0, 100.0);
    }

    /// Combat strength used for building attacks and AI force ratios
    pub fn strength(&self, id: CorpsId, catalog: &UnitCatalog) -> f64 {
        self.get(id)
            .map(|c| corps_strength(c, catalog, &self.config))
            .unwrap_or(0.0)
    }

    /// Days to reach `target` at the corps' current pace
    pub fn eta(&self, id: CorpsId, target: HexCoord, grid: &TerrainGrid, catalog: &UnitCatalog) -> Option<u32> {
        self.get(id)
            .map(|c| estimate_days(c, target, grid, catalog, &self.config))
    }
}

impl CorpsState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving => "moving",
            Self::Attacking => "attacking",
            Self::Defending => "defending",
            Self::Retreating => "retreating",
            Self::Routing => "routing",
        }
    }
}

fn validate_target(grid: &TerrainGrid, target: HexCoord) -> Result<(), CommandError> {
    if !grid.in_bounds(target) {
        return Err(CommandError::OutOfBounds(target.to_string()));
    }
    if !grid.is_open(target) {
        return Err(CommandError::Impassable(target.to_string()));
    }
    Ok(())
}

fn start_march(corps: &mut Corps, target: HexCoord, command: CorpsCommand) {
    corps.state = CorpsState::Moving;
    corps.target = Some(target);
    corps.pending = Some(command);
    corps.progress = 0.0;
}

fn arrive(corps: &mut Corps, config: &CorpsConfig) {
    corps.target = None;
    corps.progress = 0.0;
    match corps.pending {
        Some(CorpsCommand::Attack { .. }) => corps.state = CorpsState::Attacking,
        Some(CorpsCommand::Retreat { .. }) => recover_at_edge(corps, config),
        _ => {
            corps.state = CorpsState::Idle;
            corps.pending = None;
        }
    }
}

fn recover_at_edge(corps: &mut Corps, config: &CorpsConfig) {
    corps.state = CorpsState::Idle;
    corps.pending = None;
    corps.target = None;
    corps.morale = (corps.morale + config.retreat_recovery_morale).clamp(0.0, 100.0);
    // still broken after regrouping
    check_rout(corps, config);
}

/// Enter routing when morale breaks, unless already falling back
fn check_rout(corps: &mut Corps, config: &CorpsConfig) -> bool {
    if corps.morale < config.rout_morale
        && !matches!(corps.state, CorpsState::Retreating | CorpsState::Routing)
    {
        corps.state = CorpsState::Routing;
        corps.pending = None;
        corps.target = None;
        tracing::info!(corps = corps.id.0, morale = corps.morale, "corps routed");
        return true;
    }
    false
}

/// Edge cell a side retreats to: its own map edge, centre row if open
pub fn retreat_point(side: Side, grid: &TerrainGrid) -> HexCoord {
    let q = match side {
        Side::Attacker => 0,
        Side::Defender => grid.width as i32 - 1,
    };
    let mid = grid.height as i32 / 2;
    let mut rows: Vec<i32> = (0..grid.height as i32).collect();
    rows.sort_by_key(|r| ((r - mid).abs(), *r));
    rows.into_iter()
        .map(|r| HexCoord::new(q, r))
        .find(|c| grid.is_open(*c))
        .unwrap_or(HexCoord::new(q, mid))
}

/// Cells per day on plain terrain, before terrain costs
pub fn march_speed(corps: &Corps, catalog: &UnitCatalog, config: &CorpsConfig) -> f64 {
    let base = catalog.slowest_speed(&corps.units).unwrap_or(FALLBACK_SPEED);
    let supply_mod = if corps.supplies > config.supply_speed_threshold {
        1.0
    } else {
        config.low_supply_speed
    };
    let morale_mod = if corps.morale > config.morale_speed_threshold {
        1.0
    } else {
        config.low_morale_speed
    };
    let general_mod = 1.0 + corps.general_bonuses().speed;
    base * supply_mod * morale_mod * general_mod
}

/// `ceil(distance / effective speed)` using the average terrain cost of the path
pub fn estimate_days(
    corps: &Corps,
    target: HexCoord,
    grid: &TerrainGrid,
    catalog: &UnitCatalog,
    config: &CorpsConfig,
) -> u32 {
    let distance = corps.position.distance(&target);
    if distance == 0 {
        return 0;
    }
    let effective = march_speed(corps, catalog, config) / grid.average_path_cost(corps.position, target);
    if effective <= 0.0 {
        return u32::MAX;
    }
    // guard float noise like 10 / 5.0000000001
    (distance as f64 / effective - 1e-9).ceil().max(1.0) as u32
}

/// Multiplier a corps' command puts on its attack and defense
///
/// With a general: 1 + mean of its attack and defense bonuses. Without one
/// the corps fights at `no_general_penalty`.
pub fn command_factor(corps: &Corps, config: &CorpsConfig) -> f64 {
    match &corps.general {
        Some(general) => {
            let b = general.bonuses();
            (1.0 + (b.attack + b.defense) / 2.0).max(0.0)
        }
        None => config.no_general_penalty,
    }
}

pub fn corps_strength(corps: &Corps, catalog: &UnitCatalog, config: &CorpsConfig) -> f64 {
    let raw: f64 = corps
        .units
        .iter()
        .filter_map(|(id, n)| catalog.get(id).map(|u| n as f64 * (u.attack + u.defense) / 2.0))
        .sum();
    let supply_mod = if corps.supplies > config.low_supply_threshold {
        1.0
    } else {
        config.low_supply_power
    };
    let defend_mod = if corps.state == CorpsState::Defending {
        1.0 + config.defend_bonus
    } else {
        1.0
    };
    raw * corps.morale / 100.0 * supply_mod * defend_mod * command_factor(corps, config)
}
