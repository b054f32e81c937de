use std::{path::PathBuf, process::ExitCode, sync::Arc};

use hikari::{
    canvas::Canvas,
    integrators::PathIntegrator,
    renderer::{self, RenderSettings},
    scene::{Scene, SceneLoadSettings},
};

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}:{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(why) = setup_logger() {
        eprintln!("Logger init failed: {:?}", why);
        return ExitCode::FAILURE;
    }

    let load_settings = SceneLoadSettings {
        path: std::env::args()
            .nth(1)
            .map_or_else(|| PathBuf::from("test_scene.xml"), PathBuf::from),
        ..SceneLoadSettings::default()
    };

    let (scene, _) = match Scene::load(&load_settings) {
        Ok(loaded) => loaded,
        Err(why) => {
            eprintln!("Scene load failed: {}", why);
            return ExitCode::FAILURE;
        }
    };

    let canvas = Arc::new(Canvas::new(scene.width as usize, scene.height as usize));
    renderer::render(
        Arc::new(scene),
        canvas,
        Arc::new(PathIntegrator::default()),
        &RenderSettings::default(),
    );

    ExitCode::SUCCESS
}
