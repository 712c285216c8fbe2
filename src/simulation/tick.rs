//! Daily tick
//!
//! Each active front runs, in order:
//! 1. corps upkeep and movement
//! 2. engagements: one battle per contested cell
//! 3. building attacks, infrastructure damage and plunder
//! 4. bookkeeping: area control, regeneration, end conditions
//!
//! AI belligerents decide last, against the state committed above.

use std::collections::{BTreeMap, BTreeSet};

use crate::ai::{AiAction, AiDecision, DecisionContext};
use crate::combat::{compute_loot, resolve_profiles, Battle, BattleKind, Combatant, EndReason, ProfileBuilder};
use crate::core::config::EngagementMode;
use crate::core::error::{CommandError, CommandOk, CommandResult};
use crate::core::types::{BattleId, CorpsId, FrontId, HexCoord, PolityId, Side};
use crate::corps::manager::{command_factor, corps_strength, CorpsFate};
use crate::corps::{AttackTarget, BattleRecord, CorpsState};
use crate::simulation::{EngagementReport, FrontEvent, WarSimulation};
use crate::units::{total_losses, Army, Losses};

/// One side of an engagement as it entered the battle
struct Engaged {
    id: CorpsId,
    owner: PolityId,
    units: Army,
    morale: f64,
    /// Command buff from the general, negative when leaderless
    buff: f64,
    defending: bool,
}

/// Losses per front side and the winner
struct Clash {
    winner: Side,
    decisive: bool,
    rounds: Option<u32>,
    losses: [Losses; 2],
    loot: BTreeMap<String, u64>,
}

impl WarSimulation {
    /// Advance every active front by one day
    pub fn tick(&mut self) -> Vec<FrontEvent> {
        self.day += 1;
        let mut events = Vec::new();
        for front in self.registry.active_ids() {
            self.upkeep_and_movement(front, &mut events);
            self.resolve_engagements(front, &mut events);
            self.assault_assets(front, &mut events);
            self.bookkeeping(front, &mut events);
        }
        self.run_ai(&mut events);

        tracing::debug!(day = self.day, events = events.len(), "tick complete");
        debug_assert!(self.check_invariants().is_ok(), "unit ledger out of balance");
        events
    }

    fn upkeep_and_movement(&mut self, front_id: FrontId, events: &mut Vec<FrontEvent>) {
        let Some(front) = self.registry.get_mut(front_id) else { return };
        front.advance_day();
        let supply = [
            front.economic_impact(Side::Attacker).supply_bonus,
            front.economic_impact(Side::Defender).supply_bonus,
        ];

        let ids: Vec<CorpsId> = front.corps.iter().flatten().copied().collect();
        for id in ids {
            let Some(corps) = self.corps.get(id) else { continue };
            let side = corps.side;
            if self.corps.daily_upkeep(id, supply[side.index()]) {
                events.push(FrontEvent::CorpsRouted { front: front_id, corps: id });
            }

            match self.corps.get(id).and_then(|c| c.attack_target()) {
                Some(AttackTarget::Corps(target)) => match self.corps.get(target) {
                    Some(enemy) if enemy.front == Some(front_id) => {
                        let at = enemy.position;
                        self.corps.pursue(id, at);
                    }
                    _ => self.corps.stand_down(id),
                },
                Some(AttackTarget::Building(b)) => {
                    if front.building(b).map_or(true, |b| b.destroyed) {
                        self.corps.stand_down(id);
                    }
                }
                Some(AttackTarget::Infrastructure(i)) => {
                    if front.infra(i).map_or(true, |i| i.destroyed) {
                        self.corps.stand_down(id);
                    }
                }
                None => {}
            }

            if let Some(step) = self.corps.advance(id, &front.grid, &self.catalog) {
                if step.from != step.to || step.arrived {
                    events.push(FrontEvent::CorpsMoved {
                        front: front_id,
                        corps: id,
                        from: step.from,
                        to: step.to,
                        arrived: step.arrived,
                    });
                }
            }
        }
    }

    /// Strongest corps of each side on every cell both sides occupy
    fn contested_cells(&self, front_id: FrontId) -> Vec<(HexCoord, [CorpsId; 2])> {
        let mut cells: BTreeMap<HexCoord, [Option<(f64, CorpsId)>; 2]> = BTreeMap::new();
        for corps in self.corps.on_front(front_id) {
            let strength = corps_strength(corps, &self.catalog, self.corps.config());
            let slot = &mut cells.entry(corps.position).or_default()[corps.side.index()];
            let stronger = match slot {
                Some((best, best_id)) => strength > *best || (strength == *best && corps.id < *best_id),
                None => true,
            };
            if stronger {
                *slot = Some((strength, corps.id));
            }
        }
        cells
            .into_iter()
            .filter_map(|(at, [a, d])| Some((at, [a?.1, d?.1])))
            .collect()
    }

    fn resolve_engagements(&mut self, front_id: FrontId, events: &mut Vec<FrontEvent>) {
        for (at, [attacker_id, defender_id]) in self.contested_cells(front_id) {
            let (Some(a), Some(d)) = (self.corps.get(attacker_id), self.corps.get(defender_id)) else {
                continue;
            };
            // the side that pressed the attack strikes first
            let initiator = if d.state == CorpsState::Attacking && a.state != CorpsState::Attacking {
                Side::Defender
            } else {
                Side::Attacker
            };
            let config = self.corps.config();
            let engaged = [a, d].map(|c| Engaged {
                id: c.id,
                owner: c.owner,
                units: c.units.clone(),
                morale: c.morale,
                buff: command_factor(c, config) - 1.0,
                defending: c.state == CorpsState::Defending,
            });

            let Some(clash) = self.fight(front_id, at, &engaged, initiator) else { continue };
            self.fold_clash(front_id, at, &engaged, clash, events);
        }
    }

    /// Run one engagement with `initiator` as the battle attacker
    fn fight(&mut self, front_id: FrontId, at: HexCoord, engaged: &[Engaged; 2], initiator: Side) -> Option<Clash> {
        let front = self.registry.get(front_id)?;
        let striker = &engaged[initiator.index()];
        let holder = &engaged[initiator.opposite().index()];
        let wealth = self
            .economies
            .get(&holder.owner)
            .map(|e| e.wealth)
            .filter(|w| *w > 0.0)
            .unwrap_or(self.rules.combat.default_defender_wealth);

        let (winner, decisive, rounds, striker_losses, holder_losses, loot) = match self.rules.battle.engagement {
            EngagementMode::Instant => {
                let combat = &self.rules.combat;
                let impact = front.economic_impact(initiator.opposite());
                let mut multiplier = combat.defender_defense_multiplier
                    * (1.0 + front.grid.defense_bonus(at))
                    * (1.0 + impact.defense_bonus);
                if holder.defending {
                    multiplier *= 1.0 + self.rules.corps.defend_bonus;
                }
                let striker_profile = ProfileBuilder::new(&self.catalog, combat)
                    .with_buff(striker.buff)
                    .build(&striker.units, &holder.units);
                let holder_profile = ProfileBuilder::new(&self.catalog, combat)
                    .with_buff(holder.buff)
                    .with_defense_multiplier(multiplier)
                    .build(&holder.units, &striker.units);
                let report = resolve_profiles(combat, &striker_profile, &holder_profile, wealth, &mut self.rng);
                let winner = if report.victory { initiator } else { initiator.opposite() };
                (winner, report.decisive, None, report.attacker_losses, report.defender_losses, report.loot)
            }
            EngagementMode::Rounds => {
                self.next_battle += 1;
                let combatant = |e: &Engaged| {
                    Combatant::new(e.units.clone())
                        .with_corps(e.id)
                        .with_morale(e.morale)
                        .with_buff(e.buff)
                };
                let mut battle = match Battle::new(
                    BattleId(self.next_battle),
                    Some(front_id),
                    BattleKind::Pitched,
                    combatant(striker),
                    combatant(holder),
                    &self.rules.battle,
                    &mut self.rng,
                ) {
                    Ok(battle) => battle,
                    Err(e) => {
                        tracing::warn!(front = front_id.0, "engagement skipped: {e}");
                        return None;
                    }
                };
                let result = battle
                    .run_to_completion(&self.catalog, &self.rules.combat, &self.rules.battle, &mut self.rng)?
                    .clone();
                let decisive = matches!(result.reason, EndReason::Annihilation | EndReason::Rout);
                let winner = match result.winner {
                    Side::Attacker => initiator,
                    Side::Defender => initiator.opposite(),
                };
                let loot = if winner == initiator {
                    compute_loot(&self.rules.combat, wealth, decisive)
                } else {
                    BTreeMap::new()
                };
                (
                    winner,
                    decisive,
                    Some(result.rounds),
                    result.attacker_casualties,
                    result.defender_casualties,
                    loot,
                )
            }
        };

        let mut losses = [Losses::new(), Losses::new()];
        losses[initiator.index()] = striker_losses;
        losses[initiator.opposite().index()] = holder_losses;
        Some(Clash {
            winner,
            decisive,
            rounds,
            losses,
            loot,
        })
    }

    /// Apply an engagement's losses to corps, front and ledger
    fn fold_clash(
        &mut self,
        front_id: FrontId,
        at: HexCoord,
        engaged: &[Engaged; 2],
        clash: Clash,
        events: &mut Vec<FrontEvent>,
    ) {
        let Some(front) = self.registry.get_mut(front_id) else { return };
        let casualties = [total_losses(&clash.losses[0]), total_losses(&clash.losses[1])];
        let score_delta = front.record_battle(clash.winner, casualties[0], casualties[1]);
        for (resource, amount) in &clash.loot {
            *front.plundered[clash.winner.index()].entry(resource.clone()).or_insert(0.0) += *amount as f64;
        }

        for side in Side::BOTH {
            let me = &engaged[side.index()];
            let record = BattleRecord {
                day: self.day,
                enemy: Some(engaged[side.opposite().index()].id),
                won: clash.winner == side,
                casualties: casualties[side.index()],
                enemy_casualties: casualties[side.opposite().index()],
            };
            if let Some(held) = self.ledger.get_mut(&me.owner) {
                *held = held.saturating_sub(casualties[side.index()] as u64);
            }
            match self
                .corps
                .apply_battle(me.id, &clash.losses[side.index()], record, &front.grid, &self.catalog)
            {
                Ok(CorpsFate::Destroyed) => {
                    front.forget_corps(me.id);
                    events.push(FrontEvent::CorpsDestroyed { front: front_id, corps: me.id });
                }
                Ok(_) => self.corps.battle_upkeep(me.id),
                Err(e) => tracing::warn!(corps = me.id.0, "battle result not applied: {e}"),
            }
        }

        tracing::info!(
            front = front_id.0,
            %at,
            winner = ?clash.winner,
            attacker_casualties = casualties[0],
            defender_casualties = casualties[1],
            "engagement resolved"
        );
        events.push(FrontEvent::Engagement {
            front: front_id,
            report: EngagementReport {
                at,
                attacker: engaged[0].id,
                defender: engaged[1].id,
                winner: clash.winner,
                decisive: clash.decisive,
                rounds: clash.rounds,
                attacker_casualties: casualties[0],
                defender_casualties: casualties[1],
                loot: clash.loot,
                score_delta,
            },
        });
    }

    fn assault_assets(&mut self, front_id: FrontId, events: &mut Vec<FrontEvent>) {
        let Some(front) = self.registry.get_mut(front_id) else { return };
        let ids: Vec<CorpsId> = front.corps.iter().flatten().copied().collect();
        let factor = self.corps.config().building_damage_factor;

        for &id in &ids {
            let Some(corps) = self.corps.get(id) else { continue };
            if corps.state != CorpsState::Attacking {
                continue;
            }
            let (side, position) = (corps.side, corps.position);
            let siege = 1.0 + corps.general_bonuses().siege;
            let damage = corps_strength(corps, &self.catalog, self.corps.config()) * factor * siege;

            match corps.attack_target() {
                Some(AttackTarget::Building(b)) => {
                    let adjacent = front
                        .building(b)
                        .is_some_and(|b| !b.destroyed && b.position.distance(&position) <= 1);
                    if !adjacent {
                        self.corps.stand_down(id);
                        continue;
                    }
                    match front.damage_building(b, side, damage) {
                        Ok(Some(destroyed)) => {
                            self.corps.stand_down(id);
                            events.push(FrontEvent::BuildingDestroyed {
                                front: front_id,
                                corps: id,
                                destroyed,
                            });
                        }
                        Ok(None) => {
                            let remaining = front.building(b).map_or(0.0, |b| b.health);
                            events.push(FrontEvent::BuildingDamaged {
                                front: front_id,
                                building: b,
                                damage,
                                remaining,
                            });
                        }
                        Err(_) => self.corps.stand_down(id),
                    }
                }
                Some(AttackTarget::Infrastructure(i)) => {
                    let adjacent = front.infra(i).is_some_and(|i| i.position.distance(&position) <= 1);
                    if !adjacent {
                        self.corps.stand_down(id);
                        continue;
                    }
                    match front.damage_infrastructure(i, side, damage, &self.corps) {
                        Ok(destroyed) => {
                            if destroyed {
                                self.corps.stand_down(id);
                            }
                            events.push(FrontEvent::InfrastructureDamaged {
                                front: front_id,
                                infra: i,
                                destroyed,
                            });
                        }
                        // contested; keep trying while the enemy holds on
                        Err(CommandError::NotControlled(_)) => {}
                        Err(_) => self.corps.stand_down(id),
                    }
                }
                _ => {}
            }
        }

        // corps standing next to enemy stockpiles help themselves
        let mut taken = BTreeSet::new();
        for &id in &ids {
            let Some(corps) = self.corps.get(id) else { continue };
            if !matches!(
                corps.state,
                CorpsState::Idle | CorpsState::Defending | CorpsState::Attacking
            ) {
                continue;
            }
            let (side, position) = (corps.side, corps.position);
            let nearby: Vec<_> = front
                .resource_nodes
                .iter()
                .filter(|n| n.owner != side && !n.plundered && n.position.distance(&position) <= 1)
                .map(|n| n.id)
                .collect();
            for node in nearby {
                if !taken.insert(node) {
                    continue;
                }
                if let Ok(amount) = front.plunder_node(node, side, &self.corps) {
                    if amount > 0.0 {
                        events.push(FrontEvent::NodePlundered {
                            front: front_id,
                            node,
                            side,
                            amount,
                        });
                    }
                }
            }
        }
    }

    fn bookkeeping(&mut self, front_id: FrontId, events: &mut Vec<FrontEvent>) {
        let Some(front) = self.registry.get_mut(front_id) else { return };
        let bonus = front.update_area_control(&self.corps);
        if bonus != 0.0 {
            events.push(FrontEvent::ControlBonus {
                front: front_id,
                score_delta: bonus,
            });
        }
        front.regenerate();
        if let Some(outcome) = front.check_end() {
            events.push(FrontEvent::WarEnded {
                front: front_id,
                outcome,
            });
            self.registry.release(front_id, &mut self.corps);
        }
    }

    fn run_ai(&mut self, events: &mut Vec<FrontEvent>) {
        for index in 0..self.ais.len() {
            let polity = self.ais[index].polity();
            let fronts: Vec<FrontId> = self
                .registry
                .iter()
                .filter(|f| f.is_active() && f.side_of(polity).is_some())
                .map(|f| f.id)
                .collect();

            for front_id in fronts {
                let Some(front) = self.registry.get(front_id) else { continue };
                let context = DecisionContext {
                    front,
                    corps: &self.corps,
                    catalog: &self.catalog,
                    config: &self.rules.ai,
                    standing: self.pool.army(polity),
                };
                let decisions = self.ais[index].decide(&context);

                for decision in decisions {
                    let outcome = self.execute_decision(front_id, polity, &decision);
                    if let Err(e) = &outcome {
                        tracing::debug!(polity = polity.0, "ai order rejected: {e}");
                    }
                    events.push(FrontEvent::AiOrder {
                        front: front_id,
                        polity,
                        decision,
                        result: CommandResult::from(outcome),
                    });
                }
            }
        }
    }

    fn execute_decision(
        &mut self,
        front: FrontId,
        polity: PolityId,
        decision: &AiDecision,
    ) -> Result<CommandOk, CommandError> {
        if let AiAction::CreateCorps { units } = &decision.action {
            let name = format!("Corps {}", self.corps.owned_by(polity).count() + 1);
            let id = self.raise_corps(front, polity, name, units)?;
            return Ok(CommandOk::new(format!("raised corps {}", id.0)));
        }

        let id = decision.corps.ok_or(CommandError::UnknownTarget)?;
        let corps = self.corps.get(id).ok_or(CommandError::UnknownCorps(id))?;
        if corps.owner != polity {
            return Err(CommandError::NotControlled("corps"));
        }
        match decision.action {
            AiAction::Retreat => self.retreat(id),
            AiAction::AttackCorps { target, .. } => self.attack(id, AttackTarget::Corps(target)),
            AiAction::AttackBuilding { target, .. } => self.attack(id, AttackTarget::Building(target)),
            AiAction::Defend => self.defend(id),
            AiAction::Reposition { to } => self.move_corps(id, to),
            AiAction::CreateCorps { .. } => Err(CommandError::UnknownTarget),
        }
    }
}
