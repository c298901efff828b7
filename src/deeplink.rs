//! `?npc=<sketch|photo|ar>` deep links. The query is read once at startup and the matching kiosk
//! opens after a short delay once the scene is playing.

use bevy::prelude::*;

use crate::config::GameTuning;
use crate::state::{GameSet, GameState};
use crate::zones::{KioskActivated, KioskKind};

pub struct DeepLinkPlugin;

impl Plugin for DeepLinkPlugin {
    fn build(&self, app: &mut App) {
        let delay = app
            .world()
            .get_resource::<GameTuning>()
            .map(|tuning| tuning.deep_link.delay_secs)
            .unwrap_or(1.0);

        let target = launch_query().as_deref().and_then(parse_npc_query);
        if let Some(kind) = target {
            info!("Deep link requests {}.", kind.label());
        }

        app.insert_resource(PendingDeepLink::new(target, delay))
            .add_systems(
                Update,
                fire_deep_link
                    .in_set(GameSet::Effects)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

/// Extracts the kiosk from a query string such as `?npc=photo&ref=home`. Only the three kiosks that
/// deep links are published for are accepted.
pub fn parse_npc_query(query: &str) -> Option<KioskKind> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "npc")
        .and_then(|(_, value)| KioskKind::from_query_value(value))
        .filter(|kind| {
            matches!(
                kind,
                KioskKind::Sketch | KioskKind::Photo | KioskKind::ArTrace
            )
        })
}

#[cfg(all(target_arch = "wasm32", feature = "web"))]
fn launch_query() -> Option<String> {
    crate::wasm::location_query()
}

/// Natively the query comes from a `--npc=<value>` argument.
#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
fn launch_query() -> Option<String> {
    std::env::args()
        .skip(1)
        .find(|arg| arg.starts_with("--npc="))
        .map(|arg| arg.trim_start_matches("--").to_owned())
}

#[derive(Resource, Debug)]
pub struct PendingDeepLink {
    pub target: Option<KioskKind>,
    pub timer: Timer,
}

impl PendingDeepLink {
    pub fn new(target: Option<KioskKind>, delay_secs: f32) -> Self {
        Self {
            target,
            timer: Timer::from_seconds(delay_secs, TimerMode::Once),
        }
    }
}

fn fire_deep_link(
    time: Res<Time>,
    mut pending: ResMut<PendingDeepLink>,
    mut activated: EventWriter<KioskActivated>,
) {
    if pending.target.is_none() {
        return;
    }

    if !pending.timer.tick(time.delta()).finished() {
        return;
    }

    if let Some(kind) = pending.target.take() {
        activated.send(KioskActivated(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn npc_parameter_selects_kiosk() {
        assert_eq!(parse_npc_query("?npc=sketch"), Some(KioskKind::Sketch));
        assert_eq!(parse_npc_query("?ref=home&npc=photo"), Some(KioskKind::Photo));
        assert_eq!(parse_npc_query("npc=AR"), Some(KioskKind::ArTrace));
    }

    #[test]
    fn unknown_or_missing_npc_is_ignored() {
        assert_eq!(parse_npc_query(""), None);
        assert_eq!(parse_npc_query("?npc=dragon"), None);
        assert_eq!(parse_npc_query("?npc=video"), None);
        assert_eq!(parse_npc_query("?kiosk=sketch"), None);
    }

    #[derive(Resource, Default)]
    struct Fired(usize);

    fn count(mut events: EventReader<KioskActivated>, mut fired: ResMut<Fired>) {
        fired.0 += events.read().count();
    }

    #[test]
    fn deep_link_fires_once_after_delay() {
        let mut app = App::new();
        app.init_resource::<Time>()
            .init_resource::<Fired>()
            .add_event::<KioskActivated>()
            .insert_resource(PendingDeepLink::new(Some(KioskKind::Photo), 1.0))
            .add_systems(Update, (fire_deep_link, count).chain());

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(600));
        app.update();
        assert_eq!(app.world().resource::<Fired>().0, 0);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(600));
        app.update();
        assert_eq!(app.world().resource::<Fired>().0, 1);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(600));
        app.update();
        assert_eq!(app.world().resource::<Fired>().0, 1);
    }
}
