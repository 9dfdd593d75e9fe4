use bevy::prelude::*;

use crate::render::{ChartScenePlugin, ChartView};

#[cfg(not(target_arch = "wasm32"))]
pub fn run_chart(view: ChartView) {
    let bg = view.config.background;
    App::new()
        .insert_resource(ClearColor(Color::srgb(bg.r, bg.g, bg.b)))
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    title: format!("{} chart", view.chart_type),
                    ..default()
                }),
                ..default()
            }),
            ChartScenePlugin,
        ))
        .add_systems(Startup, spawn_view(view))
        .run();
}

#[cfg(target_arch = "wasm32")]
pub fn run_chart(view: ChartView, canvas_id: &str) {
    let bg = view.config.background;
    App::new()
        .insert_resource(ClearColor(Color::srgb(bg.r, bg.g, bg.b)))
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    canvas: Some(format!("#{}", canvas_id)),
                    fit_canvas_to_parent: true,
                    ..default()
                }),
                ..default()
            }),
            ChartScenePlugin,
        ))
        .add_systems(Startup, spawn_view(view))
        .run();
}

fn spawn_view(view: ChartView) -> impl FnMut(Commands) {
    move |mut commands: Commands| {
        commands.spawn((Name::new("chart"), view.clone()));
    }
}
