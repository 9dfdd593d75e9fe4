use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};

use super::backend::ChartBackend;
use super::components::{ChartStatus, ChartView, SnapshotRequest};
use super::resources::{ChartSlots, HostState};
use super::slot::ChartSlot;
use super::{Host, SurfaceSize};
use crate::ChartError;

const WHEEL_ZOOM_STEP: f32 = 0.95;

fn window_size(width: f32, height: f32) -> SurfaceSize {
    SurfaceSize::new(width.round().max(0.0) as u32, height.round().max(0.0) as u32)
}

fn mirror(status: &mut ChartStatus, slot: &ChartSlot) {
    status.state = slot.state();
    status.frames = slot.scene().map_or(0, |s| s.frames_rendered());
}

/// Keep the host's container size in step with the primary window.
pub fn sync_host_size(windows: Query<&Window, With<PrimaryWindow>>, mut host: ResMut<HostState>) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window_size(window.width(), window.height());
    if size.height > 0 && host.container_size() != size {
        host.set_size(size);
    }
}

/// Dispose scenes whose `ChartView` was removed or whose entity despawned.
pub fn dispose_removed_views(
    mut removed: RemovedComponents<ChartView>,
    mut slots: ResMut<ChartSlots>,
    mut backend: ChartBackend,
    mut host: ResMut<HostState>,
) {
    for entity in removed.read() {
        if let Some(mut slot) = slots.by_view.remove(&entity) {
            let report = slot.dispose(&mut backend, &mut **host);
            tracing::debug!(?entity, objects = report.objects, "disposed removed chart");
        }
    }
}

/// Rebuild every chart whose inputs changed (including newly added ones).
pub fn rebuild_changed_views(
    mut views: Query<(Entity, &ChartView, &mut ChartStatus), Changed<ChartView>>,
    mut slots: ResMut<ChartSlots>,
    mut backend: ChartBackend,
    mut host: ResMut<HostState>,
) {
    for (entity, view, mut status) in views.iter_mut() {
        let slot = slots.by_view.entry(entity).or_default();
        let result = slot.rebuild_tagged(
            view.dataset.clone(),
            view.axes.clone(),
            &view.chart_type,
            &view.config,
            &mut backend,
            &mut **host,
        );
        status.error = result.err().map(|report| report.current_context().clone());
        mirror(&mut status, slot);
    }
}

pub fn follow_window_resize(
    mut resized: MessageReader<WindowResized>,
    mut slots: ResMut<ChartSlots>,
    mut backend: ChartBackend,
) {
    // Only the latest size matters.
    let Some(event) = resized.read().last() else {
        return;
    };
    let size = window_size(event.width, event.height);
    for slot in slots.by_view.values_mut() {
        slot.resize(size, &mut backend);
    }
}

/// Left drag orbits, the wheel zooms. Applied to every live chart.
pub fn orbit_input(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    mut wheel: MessageReader<MouseWheel>,
    mut slots: ResMut<ChartSlots>,
    host: Res<HostState>,
) {
    let mut drag = Vec2::ZERO;
    for event in motion.read() {
        drag += event.delta;
    }
    let mut scroll = 0.0;
    for event in wheel.read() {
        scroll += event.y;
    }
    if !mouse.pressed(MouseButton::Left) {
        drag = Vec2::ZERO;
    }
    if drag == Vec2::ZERO && scroll == 0.0 {
        return;
    }

    let height = host.container_size().height.max(1) as f32;
    let turn = std::f32::consts::TAU / height;
    for slot in slots.by_view.values_mut() {
        let Some(controls) = slot.scene_mut().and_then(|s| s.controls_mut()) else {
            continue;
        };
        if drag != Vec2::ZERO {
            controls.rotate(drag.x * turn, drag.y * turn);
        }
        if scroll != 0.0 {
            controls.zoom(WHEEL_ZOOM_STEP.powf(scroll));
        }
    }
}

/// Fire the frame callbacks requested during the previous update.
pub fn drive_render_loops(
    mut slots: ResMut<ChartSlots>,
    mut statuses: Query<&mut ChartStatus>,
    mut backend: ChartBackend,
    mut host: ResMut<HostState>,
) {
    let fired = host.advance();
    if fired.is_empty() {
        return;
    }
    for (entity, slot) in slots.by_view.iter_mut() {
        let result = slot.pump(&fired, &mut backend, &mut **host);
        let Ok(mut status) = statuses.get_mut(*entity) else {
            continue;
        };
        if let Err(report) = result {
            tracing::error!(?entity, error = %report.current_context(), "chart render failed");
            status.error = Some(report.current_context().clone());
        }
        mirror(&mut status, slot);
    }
}

/// Serve pending snapshot requests. Requests wait while the chart is live
/// but has not rendered yet; otherwise they are answered and removed.
pub fn take_snapshots(
    requests: Query<(Entity, &SnapshotRequest)>,
    mut statuses: Query<&mut ChartStatus>,
    slots: Res<ChartSlots>,
    mut backend: ChartBackend,
) {
    for (entity, request) in requests.iter() {
        let slot = slots.by_view.get(&entity);
        let waiting = slot
            .and_then(|s| s.scene().filter(|_| s.is_live()))
            .is_some_and(|scene| scene.frames_rendered() == 0);
        if waiting {
            continue;
        }

        let result = match slot {
            Some(slot) => slot.snapshot(&request.path, &mut backend),
            None => Err(error_stack::Report::new(ChartError::SnapshotUnavailable(
                "entity has no chart".into(),
            ))),
        };
        if let Err(report) = result {
            tracing::warn!(?entity, error = %report.current_context(), "snapshot failed");
            if let Ok(mut status) = statuses.get_mut(entity) {
                status.error = Some(report.current_context().clone());
            }
        }
        backend.commands().entity(entity).remove::<SnapshotRequest>();
    }
}

/// Release every live scene when the app is shutting down.
pub fn dispose_on_exit(
    mut exits: MessageReader<AppExit>,
    mut slots: ResMut<ChartSlots>,
    mut backend: ChartBackend,
    mut host: ResMut<HostState>,
) {
    if exits.read().next().is_none() {
        return;
    }
    for (entity, mut slot) in slots.by_view.drain() {
        let report = slot.dispose(&mut backend, &mut **host);
        tracing::debug!(?entity, failures = report.failures.len(), "disposed chart on exit");
    }
}
