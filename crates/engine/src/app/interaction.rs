use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use super::{Actor, FlowState, InteractionZone, RoomSignal, SignalBus, Vec2, ZoneRegistry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipPlacement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TooltipEntry {
    pub text: String,
    #[serde(default)]
    pub placement: TooltipPlacement,
}

impl TooltipEntry {
    fn new(text: &str, placement: TooltipPlacement) -> Self {
        Self {
            text: text.to_string(),
            placement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TooltipStyle {
    pub width_px: f32,
    pub height_px: f32,
    /// Signed gap between the zone edge and the tooltip; negative pulls it onto the zone.
    pub offset_px: f32,
}

impl Default for TooltipStyle {
    fn default() -> Self {
        Self {
            width_px: 60.0,
            height_px: 28.0,
            offset_px: -10.0,
        }
    }
}

/// Prompt text and placement per zone id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TooltipCatalog {
    pub default_text: String,
    pub default_placement: TooltipPlacement,
    pub style: TooltipStyle,
    pub entries: HashMap<String, TooltipEntry>,
}

impl Default for TooltipCatalog {
    fn default() -> Self {
        let entries = [
            ("book-shelf", TooltipEntry::new("Read", TooltipPlacement::Top)),
            ("vending-machine", TooltipEntry::new("Buy a snack", TooltipPlacement::Top)),
            ("desk", TooltipEntry::new("Check planner", TooltipPlacement::Right)),
            ("computer", TooltipEntry::new("Use computer", TooltipPlacement::Top)),
            ("bed", TooltipEntry::new("Sleep", TooltipPlacement::Left)),
            ("exit", TooltipEntry::new("Go out", TooltipPlacement::Top)),
        ]
        .into_iter()
        .map(|(id, entry)| (id.to_string(), entry))
        .collect();
        Self {
            default_text: "Tap me".to_string(),
            default_placement: TooltipPlacement::Top,
            style: TooltipStyle::default(),
            entries,
        }
    }
}

impl TooltipCatalog {
    pub fn resolve(&self, zone_id: &str) -> (&str, TooltipPlacement) {
        match self.entries.get(zone_id) {
            Some(entry) => (entry.text.as_str(), entry.placement),
            None => (self.default_text.as_str(), self.default_placement),
        }
    }

    /// Tooltip center for `zone` with the given placement.
    pub fn anchor(&self, zone: &InteractionZone, placement: TooltipPlacement) -> Vec2 {
        let center = zone.center();
        let style = self.style;
        match placement {
            TooltipPlacement::Top => Vec2 {
                x: center.x,
                y: center.y - zone.height() * 0.5 - style.height_px * 0.5 - style.offset_px,
            },
            TooltipPlacement::Bottom => Vec2 {
                x: center.x,
                y: center.y + zone.height() * 0.5 + style.height_px * 0.5 + style.offset_px,
            },
            TooltipPlacement::Left => Vec2 {
                x: center.x - zone.width() * 0.5 - style.width_px * 0.5 - style.offset_px,
                y: center.y,
            },
            TooltipPlacement::Right => Vec2 {
                x: center.x + zone.width() * 0.5 + style.width_px * 0.5 + style.offset_px,
                y: center.y,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipView {
    pub zone_id: String,
    pub text: String,
    pub placement: TooltipPlacement,
    pub anchor: Vec2,
}

/// Tracks which zone the actor is standing at and owns the prompt shown for it.
#[derive(Debug, Clone, Default)]
pub struct InteractionTrigger {
    catalog: TooltipCatalog,
    current_zone: Option<String>,
    tooltip: Option<TooltipView>,
}

impl InteractionTrigger {
    pub fn new(catalog: TooltipCatalog) -> Self {
        Self {
            catalog,
            current_zone: None,
            tooltip: None,
        }
    }

    pub fn current_zone(&self) -> Option<&str> {
        self.current_zone.as_deref()
    }

    pub fn tooltip(&self) -> Option<&TooltipView> {
        self.tooltip.as_ref()
    }

    pub fn catalog(&self) -> &TooltipCatalog {
        &self.catalog
    }

    pub fn update(
        &mut self,
        actor: &Actor,
        zones: &ZoneRegistry,
        flow: FlowState,
        signals: &mut SignalBus,
    ) {
        if actor.is_auto_walking() {
            self.hide(signals);
            self.current_zone = None;
            return;
        }

        if !flow.allows_navigation() {
            if self.current_zone.is_some() {
                self.hide(signals);
                self.current_zone = None;
            }
            return;
        }

        let probe = actor.probe_rect();
        let found = zones.nearest_overlapping(&probe, probe.center());
        if found.map(InteractionZone::id) == self.current_zone.as_deref() {
            return;
        }

        match found {
            Some(zone) => {
                self.current_zone = Some(zone.id().to_string());
                self.show(zone, signals);
            }
            None => {
                self.current_zone = None;
                self.hide(signals);
            }
        }
    }

    /// Fires the interaction for the zone currently in range. Only live in the room.
    pub fn trigger(&self, flow: FlowState, signals: &mut SignalBus) -> Option<&str> {
        if !flow.allows_navigation() {
            debug!(flow = %flow, "interaction_ignored_outside_room");
            return None;
        }
        let zone_id = self.current_zone.as_deref()?;
        info!(zone = zone_id, "interaction_triggered");
        signals.emit(RoomSignal::InteractionTriggered {
            zone_id: zone_id.to_string(),
        });
        Some(zone_id)
    }

    pub fn hide(&mut self, signals: &mut SignalBus) {
        if self.tooltip.take().is_some() {
            signals.emit(RoomSignal::TooltipHidden);
        }
    }

    fn show(&mut self, zone: &InteractionZone, signals: &mut SignalBus) {
        let (text, placement) = self.catalog.resolve(zone.id());
        let view = TooltipView {
            zone_id: zone.id().to_string(),
            text: text.to_string(),
            placement,
            anchor: self.catalog.anchor(zone, placement),
        };
        debug!(
            zone = zone.id(),
            x = view.anchor.x,
            y = view.anchor.y,
            "tooltip_shown"
        );
        self.tooltip = Some(view);
        signals.emit(RoomSignal::TooltipShown {
            zone_id: zone.id().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ActorConfig, NavPath};

    fn zones() -> ZoneRegistry {
        ZoneRegistry::new(vec![
            InteractionZone::new("bed", Vec2::new(100.0, 100.0), 64.0, 32.0),
            InteractionZone::new("fridge", Vec2::new(300.0, 100.0), 32.0, 32.0),
        ])
        .expect("zones")
    }

    fn drain(signals: &mut SignalBus) -> Vec<RoomSignal> {
        signals.finish_tick_rollover()
    }

    #[test]
    fn anchors_follow_placement_rules() {
        let catalog = TooltipCatalog::default();
        let zone = InteractionZone::new("bed", Vec2::new(100.0, 100.0), 64.0, 32.0);
        assert_eq!(catalog.anchor(&zone, TooltipPlacement::Top), Vec2::new(100.0, 80.0));
        assert_eq!(catalog.anchor(&zone, TooltipPlacement::Bottom), Vec2::new(100.0, 120.0));
        assert_eq!(catalog.anchor(&zone, TooltipPlacement::Left), Vec2::new(48.0, 100.0));
        assert_eq!(catalog.anchor(&zone, TooltipPlacement::Right), Vec2::new(152.0, 100.0));
    }

    #[test]
    fn unknown_zone_uses_default_text_on_top() {
        let catalog = TooltipCatalog::default();
        assert_eq!(catalog.resolve("fridge"), ("Tap me", TooltipPlacement::Top));
        assert_eq!(catalog.resolve("bed"), ("Sleep", TooltipPlacement::Left));
    }

    #[test]
    fn shows_once_when_entering_and_hides_when_leaving() {
        let zones = zones();
        let mut trigger = InteractionTrigger::default();
        let mut signals = SignalBus::default();
        let mut actor = Actor::new(Vec2::new(100.0, 120.0), ActorConfig::default());

        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);
        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);
        assert_eq!(trigger.current_zone(), Some("bed"));
        assert_eq!(
            drain(&mut signals),
            [RoomSignal::TooltipShown {
                zone_id: "bed".to_string()
            }]
        );
        let view = trigger.tooltip().expect("tooltip");
        assert_eq!(view.placement, TooltipPlacement::Left);

        actor.teleport(Vec2::new(200.0, 200.0));
        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);
        assert_eq!(trigger.current_zone(), None);
        assert_eq!(drain(&mut signals), [RoomSignal::TooltipHidden]);
    }

    #[test]
    fn auto_walk_hides_and_clears_current_zone() {
        let zones = zones();
        let mut trigger = InteractionTrigger::default();
        let mut signals = SignalBus::default();
        let mut actor = Actor::new(Vec2::new(100.0, 110.0), ActorConfig::default());
        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);
        drain(&mut signals);

        actor.walk_path(NavPath::new(vec![Vec2::new(160.0, 110.0)]), true);
        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);

        assert_eq!(trigger.current_zone(), None);
        assert!(trigger.tooltip().is_none());
        assert_eq!(drain(&mut signals), [RoomSignal::TooltipHidden]);
        assert_eq!(trigger.trigger(FlowState::InRoom, &mut signals), None);
    }

    #[test]
    fn leaving_the_room_state_hides_and_blocks_triggering() {
        let zones = zones();
        let mut trigger = InteractionTrigger::default();
        let mut signals = SignalBus::default();
        let actor = Actor::new(Vec2::new(300.0, 110.0), ActorConfig::default());

        trigger.update(&actor, &zones, FlowState::InRoom, &mut signals);
        assert_eq!(trigger.trigger(FlowState::InRoom, &mut signals), Some("fridge"));
        assert_eq!(trigger.trigger(FlowState::Interaction, &mut signals), None);

        trigger.update(&actor, &zones, FlowState::Interaction, &mut signals);
        assert_eq!(trigger.current_zone(), None);
        assert_eq!(
            drain(&mut signals),
            [
                RoomSignal::TooltipShown {
                    zone_id: "fridge".to_string()
                },
                RoomSignal::InteractionTriggered {
                    zone_id: "fridge".to_string()
                },
                RoomSignal::TooltipHidden,
            ]
        );
    }
}
