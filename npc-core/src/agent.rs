//! NPC agent controller.
//!
//! Owns the behavior state of one NPC (patrol, follow, interacting,
//! moving to an object) and the speech bubble it talks through. The
//! dialogue layer reaches it only through [`ToolTarget`] and
//! [`AgentController::display_text`].
//!
//! Time advances only through [`AgentController::tick`]; the caller decides
//! how often to tick and with what delta. Movement is a straight-line step
//! toward the current destination.

use crate::dialogue::ToolTarget;
use crate::personality::{Color, PersonalityProfile};
use crate::world::{Vec3, World};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Distance below which the agent counts as not having moved.
const STUCK_DISTANCE: f32 = 0.05;

/// Text shown when the player walks up to the agent.
const PROXIMITY_GREETING: &str = "Hello there!";

/// Identity of one agent, used to key its conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tuning values for movement and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Units per second.
    pub move_speed: f32,
    pub waypoint_reached_distance: f32,
    /// Seconds without movement before skipping to the next waypoint.
    pub stuck_check_time: f32,
    /// Seconds to linger at each waypoint.
    pub min_wait_time: f32,
    pub follow_distance: f32,
    /// Seconds between follow retargets.
    pub follow_update_interval: f32,
    /// Player distance that triggers interaction.
    pub detection_radius: f32,
    pub object_search_radius: f32,
    /// Seconds the spawn greeting stays visible.
    pub greeting_duration: f32,
    /// Seconds "I'm here!" stays visible after arriving.
    pub arrival_message_duration: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.5,
            waypoint_reached_distance: 1.5,
            stuck_check_time: 5.0,
            min_wait_time: 2.0,
            follow_distance: 3.0,
            follow_update_interval: 0.5,
            detection_radius: 5.0,
            object_search_radius: 20.0,
            greeting_duration: 3.0,
            arrival_message_duration: 2.0,
        }
    }
}

impl AgentConfig {
    fn stopping_distance(&self) -> f32 {
        self.waypoint_reached_distance * 0.8
    }
}

/// The text bubble floating over an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBubble {
    text: String,
    visible: bool,
    hide_in: Option<f32>,
    color: Color,
}

impl SpeechBubble {
    fn new(color: Color) -> Self {
        Self {
            text: String::new(),
            visible: false,
            hide_in: None,
            color,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn color(&self) -> Color {
        self.color
    }

    fn show(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.visible = true;
        self.hide_in = None;
    }

    fn hide(&mut self) {
        self.visible = false;
        self.hide_in = None;
    }

    fn hide_after(&mut self, seconds: f32) {
        self.hide_in = Some(seconds);
    }

    /// Count down a pending hide. The hide is skipped, not deferred, while
    /// `hold` is set.
    fn tick(&mut self, dt: f32, hold: bool) {
        if let Some(remaining) = self.hide_in {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.hide_in = None;
                if !hold {
                    self.visible = false;
                }
            } else {
                self.hide_in = Some(remaining);
            }
        }
    }
}

/// The object an agent is currently walking to.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTarget {
    pub name: String,
    pub position: Vec3,
}

/// Snapshot of the behavior flags, for comparisons in tests and status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementFlags {
    pub following: bool,
    pub patrolling: bool,
    pub interacting: bool,
    pub moving_to_object: bool,
}

/// What the agent is doing right now, highest priority first.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorState {
    MovingTo(String),
    Interacting,
    Following,
    Waiting,
    Patrolling,
    Idle,
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorState::MovingTo(name) => write!(f, "moving to {name}"),
            BehaviorState::Interacting => f.write_str("interacting"),
            BehaviorState::Following => f.write_str("following"),
            BehaviorState::Waiting => f.write_str("waiting"),
            BehaviorState::Patrolling => f.write_str("patrolling"),
            BehaviorState::Idle => f.write_str("idle"),
        }
    }
}

/// Acknowledgment for a follow toggle, determined by the new state alone.
pub fn follow_acknowledgment(following: bool) -> &'static str {
    if following {
        "Following you!"
    } else {
        "Stopped following."
    }
}

/// One NPC: position, behavior flags, patrol route, and speech bubble.
#[derive(Debug, Clone)]
pub struct AgentController {
    id: AgentId,
    personality: PersonalityProfile,
    config: AgentConfig,
    world: World,

    position: Vec3,
    destination: Option<Vec3>,
    halted: bool,

    following: bool,
    patrolling: bool,
    interacting: bool,
    moving_to: Option<MoveTarget>,

    waypoints: Vec<Vec3>,
    waypoint_index: usize,
    wait_remaining: Option<f32>,
    stuck_timer: f32,
    last_position: Vec3,
    follow_timer: f32,

    bubble: SpeechBubble,
}

impl AgentController {
    /// Create an agent at the origin. The personality's greeting is shown
    /// immediately and hides after `greeting_duration`.
    pub fn new(
        id: impl Into<AgentId>,
        personality: PersonalityProfile,
        config: AgentConfig,
        world: World,
    ) -> Self {
        let mut bubble = SpeechBubble::new(personality.bubble_color);
        if !personality.greeting.is_empty() {
            bubble.show(personality.greeting.clone());
            bubble.hide_after(config.greeting_duration);
        }

        Self {
            id: id.into(),
            personality,
            config,
            world,
            position: Vec3::ZERO,
            destination: None,
            halted: false,
            following: false,
            patrolling: true,
            interacting: false,
            moving_to: None,
            waypoints: Vec::new(),
            waypoint_index: 0,
            wait_remaining: None,
            stuck_timer: 0.0,
            last_position: Vec3::ZERO,
            follow_timer: 0.0,
            bubble,
        }
    }

    /// Place the agent.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self.last_position = position;
        self
    }

    /// Set the patrol route and head for its first point.
    pub fn with_waypoints(mut self, waypoints: Vec<Vec3>) -> Self {
        self.waypoints = waypoints;
        self.waypoint_index = 0;
        self.destination = self.waypoints.first().copied();
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn personality(&self) -> &PersonalityProfile {
        &self.personality
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn bubble(&self) -> &SpeechBubble {
        &self.bubble
    }

    pub fn bubble_text(&self) -> &str {
        self.bubble.text()
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_patrolling(&self) -> bool {
        self.patrolling
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn move_target(&self) -> Option<&MoveTarget> {
        self.moving_to.as_ref()
    }

    pub fn flags(&self) -> MovementFlags {
        MovementFlags {
            following: self.following,
            patrolling: self.patrolling,
            interacting: self.interacting,
            moving_to_object: self.moving_to.is_some(),
        }
    }

    pub fn state(&self) -> BehaviorState {
        if let Some(target) = &self.moving_to {
            BehaviorState::MovingTo(target.name.clone())
        } else if self.interacting {
            BehaviorState::Interacting
        } else if self.following {
            BehaviorState::Following
        } else if self.wait_remaining.is_some() {
            BehaviorState::Waiting
        } else if self.patrolling && !self.waypoints.is_empty() {
            BehaviorState::Patrolling
        } else {
            BehaviorState::Idle
        }
    }

    /// Flip follow mode. Returns the new state.
    pub fn toggle_follow(&mut self) -> bool {
        self.following = !self.following;
        self.bubble.show(follow_acknowledgment(self.following));

        if self.following {
            self.patrolling = false;
            self.moving_to = None;
            self.wait_remaining = None;
            self.halted = false;
            self.follow_timer = self.config.follow_update_interval;
        } else {
            self.patrolling = true;
            self.head_to_nearest_waypoint();
        }

        info!(agent = %self.id, following = self.following, "follow mode toggled");
        self.following
    }

    /// Walk to the nearest known object whose name contains `object_name`
    /// (case-insensitive) within the search radius. Returns whether a target
    /// was found; on a miss the behavior flags are left alone.
    pub fn move_to_object(&mut self, object_name: &str) -> bool {
        let query = object_name.trim();
        let target = if query.is_empty() {
            None
        } else {
            self.world
                .nearest_matching(self.position, query, self.config.object_search_radius)
                .cloned()
        };

        let Some(target) = target else {
            debug!(agent = %self.id, query, "no matching object in range");
            self.bubble.show(format!("I can't find {object_name}..."));
            return false;
        };

        self.patrolling = false;
        self.following = false;
        self.interacting = false;
        self.wait_remaining = None;
        self.halted = false;
        self.destination = Some(target.position);
        self.bubble.show(format!("Going to {}!", target.name));

        info!(agent = %self.id, target = %target.name, "moving to object");
        self.moving_to = Some(MoveTarget {
            name: target.name,
            position: target.position,
        });
        true
    }

    /// Show conversational text. Never touches movement.
    pub fn display_text(&mut self, text: &str) {
        self.bubble.show(text);
    }

    /// Names of known objects within the search radius.
    pub fn nearby_objects(&self) -> Vec<String> {
        self.world
            .within(self.position, self.config.object_search_radius)
            .map(|o| o.name.clone())
            .collect()
    }

    /// Advance behavior by `dt` seconds. `player` is the player's position,
    /// or `None` when there is no player in the scene.
    pub fn tick(&mut self, dt: f32, player: Option<Vec3>) {
        self.bubble.tick(dt, self.interacting);

        if let Some(player) = player {
            let distance = self.position.distance(player);
            if distance <= self.config.detection_radius && self.moving_to.is_none() {
                self.halted = true;
                self.patrolling = false;
                self.interacting = true;
                if !self.bubble.is_visible() {
                    self.bubble.show(PROXIMITY_GREETING);
                }
                return;
            } else if self.interacting && self.moving_to.is_none() {
                self.interacting = false;
                self.halted = false;
                if !self.following {
                    self.patrolling = true;
                    self.bubble.hide();
                }
            }
        }

        if self.following {
            if let Some(player) = player {
                self.follow_timer += dt;
                if self.follow_timer >= self.config.follow_update_interval {
                    self.follow_timer = 0.0;
                    self.retarget_follow(player);
                }
            }
            self.advance(dt);
            return;
        }

        if self.moving_to.is_some() {
            self.advance(dt);
            self.check_arrival();
            return;
        }

        if self.patrolling {
            self.handle_patrolling(dt);
            self.advance(dt);
            self.check_if_stuck(dt);
        }
    }

    fn advance(&mut self, dt: f32) {
        if self.halted {
            return;
        }
        if let Some(destination) = self.destination {
            self.position = self
                .position
                .step_toward(destination, self.config.move_speed * dt);
        }
    }

    fn retarget_follow(&mut self, player: Vec3) {
        let away = (self.position - player).normalized();
        self.destination = Some(player + away * self.config.follow_distance);
        self.halted = false;
    }

    fn check_arrival(&mut self) {
        let Some(target) = &self.moving_to else {
            return;
        };
        if self.position.distance(target.position) > self.config.stopping_distance() {
            return;
        }

        info!(agent = %self.id, target = %target.name, "arrived at object");
        self.moving_to = None;
        self.patrolling = true;
        self.bubble.show("I'm here!");
        self.bubble.hide_after(self.config.arrival_message_duration);
        self.start_waiting();
    }

    fn handle_patrolling(&mut self, dt: f32) {
        if let Some(remaining) = self.wait_remaining {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.wait_remaining = None;
                self.next_waypoint();
            } else {
                self.wait_remaining = Some(remaining);
            }
            return;
        }

        if self.has_reached_waypoint() {
            self.start_waiting();
        }
    }

    fn has_reached_waypoint(&self) -> bool {
        self.waypoints
            .get(self.waypoint_index)
            .is_some_and(|w| self.position.distance(*w) <= self.config.waypoint_reached_distance)
    }

    fn start_waiting(&mut self) {
        self.wait_remaining = Some(self.config.min_wait_time);
        self.halted = true;
    }

    fn next_waypoint(&mut self) {
        if self.waypoints.is_empty() {
            return;
        }
        self.waypoint_index = (self.waypoint_index + 1) % self.waypoints.len();
        self.destination = Some(self.waypoints[self.waypoint_index]);
        self.halted = false;
        debug!(agent = %self.id, waypoint = self.waypoint_index, "heading to next waypoint");
    }

    fn head_to_nearest_waypoint(&mut self) {
        let nearest = self
            .waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance(self.position)
                    .total_cmp(&b.distance(self.position))
            })
            .map(|(i, w)| (i, *w));

        if let Some((index, waypoint)) = nearest {
            self.waypoint_index = index;
            self.destination = Some(waypoint);
            self.wait_remaining = None;
            self.halted = false;
        }
    }

    fn check_if_stuck(&mut self, dt: f32) {
        let moving = !self.halted && self.destination.is_some();
        if moving && self.position.distance(self.last_position) < STUCK_DISTANCE {
            self.stuck_timer += dt;
            if self.stuck_timer >= self.config.stuck_check_time {
                debug!(agent = %self.id, "stuck, skipping to next waypoint");
                self.next_waypoint();
                self.stuck_timer = 0.0;
            }
        } else {
            self.stuck_timer = 0.0;
        }
        self.last_position = self.position;
    }
}

impl ToolTarget for AgentController {
    fn toggle_follow(&mut self) -> bool {
        AgentController::toggle_follow(self)
    }

    fn move_to_object(&mut self, object_name: &str) -> bool {
        AgentController::move_to_object(self, object_name)
    }
}
